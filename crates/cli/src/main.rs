use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use bradesco_auth::{
    AssertionBuilder, RsaCredential, SignedRequestHeaders, SystemClock, create_request_signature,
    verify_signature,
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(name = "bradesco-sign", about = "Sign Bradesco API assertions and requests")]
struct Cli {
    /// PEM key of the registered certificate: PKCS#8 or PKCS#1 private key, or a
    /// public key for `verify`.
    #[clap(long, env = "BRADESCO_KEY_FILE", global = true)]
    key_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a signed assertion for the token endpoint.
    Assertion {
        #[clap(long, env = "BRADESCO_CLIENT_ID")]
        client_id: String,
        /// Token endpoint the assertion is addressed to.
        #[clap(long, env = "BRADESCO_AUDIENCE")]
        audience: Option<String>,
    },
    /// Print the X-Brad-Signature value for a request.
    Signature(RequestArgs),
    /// Print every authentication header for a request as JSON.
    Headers(RequestArgs),
    /// Check a signature against the key's public half.
    Verify {
        #[clap(long)]
        message: String,
        #[clap(long)]
        signature: String,
    },
}

#[derive(Args)]
struct RequestArgs {
    /// Bearer token returned by the token endpoint.
    #[clap(long, env = "BRADESCO_ACCESS_TOKEN")]
    token: String,
    /// Timestamp of the assertion the token was obtained with.
    #[clap(long)]
    timestamp: String,
    /// Nonce of the assertion the token was obtained with.
    #[clap(long)]
    nonce: i64,
    #[clap(long)]
    path: String,
    #[clap(long, default_value = "")]
    query: String,
    #[clap(long, conflicts_with = "body_file")]
    body: Option<String>,
    #[clap(long)]
    body_file: Option<PathBuf>,
}

impl RequestArgs {
    fn body(&self) -> Result<String> {
        match (&self.body, &self.body_file) {
            (Some(body), _) => Ok(body.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("reading request body from {}", path.display())),
            (None, None) => Ok(String::new()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Some(key_file) = cli.key_file.as_deref() else {
        bail!("--key-file (or BRADESCO_KEY_FILE) is required");
    };

    match cli.command {
        Command::Assertion { client_id, audience } => {
            let credential = load_credential(key_file, &client_id)?;
            let mut builder = AssertionBuilder::new(SystemClock);
            if let Some(audience) = audience {
                builder = builder.with_audience(audience);
            }
            let signed = builder
                .create_assertion(&client_id, &credential)
                .context("creating assertion")?;
            tracing::info!(client_id = %client_id, nonce = signed.nonce(), "assertion created");
            println!("{}", serde_json::to_string_pretty(&signed)?);
        }
        Command::Signature(args) => {
            let credential = load_credential(key_file, "cli")?;
            let body = args.body()?;
            let signature = create_request_signature(
                &args.token,
                &args.timestamp,
                &args.path,
                &args.query,
                &body,
                args.nonce,
                &credential,
            )
            .context("signing request")?;
            println!("{signature}");
        }
        Command::Headers(args) => {
            let credential = load_credential(key_file, "cli")?;
            let body = args.body()?;
            let signed = SignedRequestHeaders::sign(
                &args.token,
                args.nonce,
                &args.timestamp,
                &args.path,
                &args.query,
                &body,
                &credential,
            )
            .context("signing request")?;
            println!("{}", serde_json::to_string_pretty(&headers_json(&signed))?);
        }
        Command::Verify { message, signature } => {
            let credential = load_credential(key_file, "cli")?;
            verify_signature(&message, &signature, credential.public_key())
                .context("signature does not verify")?;
            println!("OK");
        }
    }

    Ok(())
}

/// `[name, value]` pairs in the order they are sent.
fn headers_json(signed: &SignedRequestHeaders) -> serde_json::Value {
    signed
        .headers()
        .into_iter()
        .map(|(name, value)| serde_json::json!([name, value]))
        .collect()
}

fn load_credential(path: &Path, holder: &str) -> Result<RsaCredential> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("reading key file {}", path.display()))?;
    let credential = if pem.contains("BEGIN PUBLIC KEY") {
        RsaCredential::from_public_key_pem(holder, &pem)
    } else {
        RsaCredential::from_pem(holder, &pem)
    }
    .with_context(|| format!("loading key from {}", path.display()))?;
    tracing::debug!(holder, bits = credential.key_bits(), "credential loaded");
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_json_keeps_send_order() {
        let credential = RsaCredential::from_seed("cli", "cli-seed", 2048).unwrap();
        let signed = SignedRequestHeaders::sign(
            "tok123",
            1_704_067_200_000,
            "2024-01-01T00:00:00-00:00",
            "/boletos",
            "",
            "{}",
            &credential,
        )
        .unwrap();

        let json = headers_json(&signed);
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| pair[0].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "Authorization",
                "X-Brad-Signature",
                "X-Brad-Nonce",
                "X-Brad-Timestamp",
                "X-Brad-Algorithm",
            ]
        );
        assert_eq!(json[0][1], "Bearer tok123");
        assert_eq!(json[2][1], "1704067200000");
    }
}
