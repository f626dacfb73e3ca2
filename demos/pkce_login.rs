//! Interactive Authorization Code + PKCE login against the Twitter API v2.
//! Run with: `cargo run --example pkce_login --features reqwest`
//!
//! Reads `TWITTER_CLIENT_ID`, `TWITTER_CLIENT_SECRET` and `TWITTER_REDIRECT_URI`.
//! After approving the app in the browser, paste the full redirect URL.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use twitter_oauth_v2::{
    AuthorizationHeaderProvider, CallbackParams, ClientConfig, InMemoryTokenStore, OAuthClient,
    ReqwestHttpClient, TokenAuthorizer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("twitter_oauth_v2=debug".parse()?),
        )
        .init();

    let config = ClientConfig::from_env()?;
    let http = ReqwestHttpClient::new(&config)?;
    let client = OAuthClient::new(config, http, Arc::new(InMemoryTokenStore::new()));

    let url = client
        .build_authorization_url(&["tweet.read", "users.read", "offline.access"])
        .await?;
    println!("Open this URL in your browser:\n\n{}\n", url);
    print!("Paste the redirect URL: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let token = client.handle_callback_params(&CallbackParams::from_url(line.trim())).await?;
    println!("Granted scopes: {}", token.scopes().join(" "));
    if let Some(expires_in) = token.expires_in() {
        println!("Access token expires in {}s", expires_in.num_seconds());
    }

    let authorizer = TokenAuthorizer::new(client.clone());
    let header = authorizer.authorization_header().await?;
    println!("Authorization header ready ({} chars)", header.len());

    let access_token = client.current_token().await?.map(|t| t.access_token().to_string());
    if let Some(access_token) = access_token {
        let revoked = client.revoke_token_with_hint(&access_token, Some("access_token")).await?;
        println!("Revoked: {}", revoked);
    }
    Ok(())
}
