//! `maillink auth` -- one-time Gmail OAuth consent.
//!
//! Skips the browser when `token.json` already holds a usable or
//! refreshable token.

use maillink_oauth2::{ClientSecrets, OAuthCredentialProvider, PendingAuthorization, TokenStore};
use maillink_types::{Environment, credentials_path, resolve_base_dir, token_path};
use tracing::{info, warn};

const SETUP_STEPS: &str = "\
No OAuth client configured. To set one up:
  1. Open https://console.cloud.google.com/apis/credentials
  2. Enable the Gmail API for your project
  3. Create an OAuth client ID of type \"Desktop app\"
  4. Download the JSON and save it as credentials.json in the maillink directory,
     or set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET
  5. Run 'maillink auth' again";

pub async fn run(env: &dyn Environment) -> anyhow::Result<()> {
    let base_dir = resolve_base_dir(env);
    let store = TokenStore::new(token_path(&base_dir));

    if let Some(tokens) = store.load()? {
        if tokens.is_valid() {
            println!("Already authorized. Token: {}", store.path().display());
            return Ok(());
        }
        let provider = OAuthCredentialProvider::new(TokenStore::new(store.path().to_path_buf()));
        match provider.refresh(tokens).await {
            Ok(_) => {
                println!("Token refreshed. Token: {}", store.path().display());
                return Ok(());
            }
            Err(e) => warn!(error = %e, "stored token unusable, starting consent"),
        }
    }

    let credentials = credentials_path(&base_dir);
    let Some(secrets) = ClientSecrets::discover(&credentials, env)? else {
        eprintln!("{SETUP_STEPS}");
        eprintln!("(looked for {})", credentials.display());
        std::process::exit(1);
    };

    let pending = PendingAuthorization::start(secrets).await?;
    println!("Open this URL to grant mail access:\n\n  {}\n", pending.authorize_url());
    pending.open_browser();
    info!(redirect_uri = %pending.redirect_uri(), "waiting for browser redirect");

    pending.complete(&store).await?;
    println!("Authorization complete. Token saved to {}", store.path().display());
    Ok(())
}
