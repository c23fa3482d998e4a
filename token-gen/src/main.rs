use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Mint an RS256 access token for exercising the coffee shop API locally.
///
/// The token carries the claims the API checks:
/// - iss = https://<domain>/
/// - aud = <audience>
/// - exp = iat + ttl
/// - permissions = every --permission given
///
/// The public half of the key must be published under the same kid in the
/// JWKS the API fetches from the configured domain.
#[derive(Parser, Debug)]
#[command(name = "token-gen", version, about)]
struct Args {
    /// Path to the RSA private key in PEM (PKCS#1 or PKCS#8)
    #[arg(long, value_name = "FILE")]
    private_pem: PathBuf,

    /// Key id written to the JWT header
    #[arg(long)]
    kid: String,

    /// Identity provider domain (same value as AUTH0_DOMAIN)
    #[arg(long)]
    domain: String,

    /// API audience (same value as API_AUDIENCE)
    #[arg(long)]
    audience: String,

    /// Permission string, repeatable (e.g. --permission post:drinks)
    #[arg(long = "permission", value_name = "PERMISSION")]
    permissions: Vec<String>,

    /// Lifetime in seconds. Negative values produce an already expired token.
    #[arg(long, default_value_t = 3600, allow_hyphen_values = true)]
    ttl: i64,

    /// Subject claim
    #[arg(long)]
    sub: Option<String>,

    /// Print only the token (no extra lines)
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn now_unix() -> Result<i64, Box<dyn std::error::Error>> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

fn issuer(domain: &str) -> String {
    let host = domain
        .trim()
        .trim_start_matches("https://")
        .trim_end_matches('/');
    format!("https://{}/", host)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let pem = fs::read(&args.private_pem)?;
    let key = EncodingKey::from_rsa_pem(&pem)?;

    let iat = now_unix()?;
    let jti = Uuid::new_v4().to_string();

    let mut claims = Map::new();
    claims.insert("iss".to_string(), Value::String(issuer(&args.domain)));
    claims.insert("aud".to_string(), Value::String(args.audience.clone()));
    claims.insert("iat".to_string(), Value::Number(iat.into()));
    claims.insert("exp".to_string(), Value::Number((iat + args.ttl).into()));
    claims.insert("jti".to_string(), Value::String(jti));
    if let Some(sub) = args.sub.clone() {
        claims.insert("sub".to_string(), Value::String(sub));
    }
    claims.insert(
        "permissions".to_string(),
        Value::Array(args.permissions.iter().cloned().map(Value::String).collect()),
    );
    let claims = Value::Object(claims);

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(args.kid.clone());

    let token = encode(&header, &claims, &key)?;

    if args.quiet {
        println!("{}", token);
        return Ok(());
    }

    println!("token: {}", token);
    println!("kid: {}", args.kid);
    println!("claims: {}", serde_json::to_string_pretty(&claims)?);
    println!("curl header: Authorization: Bearer {}", token);

    Ok(())
}
