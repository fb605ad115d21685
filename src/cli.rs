use dialoguer::{Confirm, Input, Password};
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::AuthSession;
use crate::client::ApiClient;
use crate::config::{Config, ConfigService};
use crate::error::{Result, ShortlyError};
use crate::store::SessionStore;
use crate::ui::UI;
use crate::urls::{validate_url, UrlService};
use crate::{
    Commands, ConfigArgs, ConfigCommand, LoginArgs, RemoveArgs, ResolveArgs, ShortenArgs,
    StatsArgs,
};

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    /// Create a new CLI handler with an optional custom config path
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    /// Load configuration using the handler's config path
    fn load_config(&self) -> Result<Config> {
        if let Some(path) = &self.config_path {
            Config::from_file_and_env(Some(path))
        } else {
            Config::load()
        }
    }

    /// Build a session on top of a fresh client, restoring any persisted
    /// login before the command runs
    fn build_session(&self) -> Result<AuthSession> {
        let config = self.load_config()?;
        let store = Arc::new(SessionStore::new(config.session_path())?);
        let client = ApiClient::new(config, store)?;
        let session = AuthSession::new(client);
        session.restore();
        Ok(session)
    }

    fn require_auth(&self, session: &AuthSession) -> Result<()> {
        if session.state().is_authenticated() {
            Ok(())
        } else {
            Err(ShortlyError::authentication(
                "Not logged in. Run `shortly login` first.",
            ))
        }
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout(),
            Commands::Status => self.handle_status(),
            Commands::List => self.handle_list().await,
            Commands::Shorten(args) => self.handle_shorten(args).await,
            Commands::Remove(args) => self.handle_remove(args).await,
            Commands::Resolve(args) => self.handle_resolve(args).await,
            Commands::Stats(args) => self.handle_stats(args).await,
            Commands::Config(args) => self.handle_config(args).await,
        }
    }

    /// Handle login command
    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let session = self.build_session()?;

        let username = match args.username {
            Some(username) => username,
            None => Input::new().with_prompt("Username").interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        if session.login(&username, &password).await {
            self.ui
                .success(&format!("Logged in as {}", username));
            Ok(())
        } else {
            let message = session
                .state()
                .login_error
                .unwrap_or_else(|| "Login failed".to_string());
            Err(ShortlyError::authentication(message))
        }
    }

    /// Handle logout command
    fn handle_logout(&mut self) -> Result<()> {
        let session = self.build_session()?;
        session.logout();
        self.ui.success("Logged out");
        Ok(())
    }

    /// Handle status command
    fn handle_status(&mut self) -> Result<()> {
        let session = self.build_session()?;
        let status = session.status();

        let mut rows = vec![
            ("Version", status.version),
            ("Endpoint", status.endpoint),
            (
                "Authentication",
                self.ui.format_auth_status(status.authenticated),
            ),
        ];

        if status.authenticated {
            rows.push(("Username", self.ui.format_field(status.username)));
            rows.push((
                "Session expires",
                self.ui
                    .format_field(status.expires_at.map(|t| t.to_rfc3339())),
            ));
        }

        self.ui.card("Status", rows);
        Ok(())
    }

    /// Handle list command
    async fn handle_list(&mut self) -> Result<()> {
        let session = self.build_session()?;
        self.require_auth(&session)?;

        let service = UrlService::new(session.client());
        let items = service.list().await;

        if items.is_empty() {
            self.ui.info("No short URLs yet.");
            return Ok(());
        }

        println!(
            "{:>5}  {:<12}  {:>7}  {}",
            "ID", "CODE", "CLICKS", "ORIGINAL URL"
        );
        self.ui.separator();
        for item in items {
            println!(
                "{:>5}  {:<12}  {:>7}  {}",
                item.id,
                item.code,
                item.click_count.unwrap_or(0),
                item.original_url
            );
        }
        Ok(())
    }

    /// Handle shorten command
    async fn handle_shorten(&mut self, args: ShortenArgs) -> Result<()> {
        let session = self.build_session()?;
        self.require_auth(&session)?;

        if !validate_url(&args.url) {
            return Err(ShortlyError::invalid_url(format!(
                "Not an absolute http(s) URL: {}",
                args.url
            )));
        }

        let service = UrlService::new(session.client());
        match service.create(&args.url).await {
            Some(item) => {
                self.ui
                    .success(&format!("Created short URL '{}'", item.code));
                println!("{} -> {}", item.code, item.original_url);
                Ok(())
            }
            None => Err(ShortlyError::internal("Failed to create the short URL")),
        }
    }

    /// Handle remove command
    async fn handle_remove(&mut self, args: RemoveArgs) -> Result<()> {
        let session = self.build_session()?;
        self.require_auth(&session)?;

        if !args.force {
            let confirmed = Confirm::new()
                .with_prompt(format!("Delete short URL {}?", args.id))
                .default(false)
                .interact()?;
            if !confirmed {
                self.ui.info("Aborted.");
                return Ok(());
            }
        }

        let service = UrlService::new(session.client());
        if service.delete(args.id).await {
            self.ui.success(&format!("Deleted short URL {}", args.id));
            Ok(())
        } else {
            Err(ShortlyError::internal(format!(
                "Failed to delete short URL {}",
                args.id
            )))
        }
    }

    /// Handle resolve command. Resolution needs no session; tracking is
    /// best-effort and never fails the command.
    async fn handle_resolve(&mut self, args: ResolveArgs) -> Result<()> {
        let session = self.build_session()?;
        let service = UrlService::new(session.client());

        let resolved = match service.resolve(&args.code).await {
            Some(url) => url,
            None => service
                .resolve_direct(&args.code)
                .await
                .ok_or_else(|| {
                    ShortlyError::api(404, format!("No URL found for code '{}'", args.code))
                })?,
        };

        if !args.no_track && !service.track(&args.code).await {
            if !service.track_direct(&args.code).await {
                self.ui.warning("Could not record the access");
            }
        }

        println!("{}", resolved);
        Ok(())
    }

    /// Handle stats command
    async fn handle_stats(&mut self, args: StatsArgs) -> Result<()> {
        let session = self.build_session()?;
        self.require_auth(&session)?;

        let service = UrlService::new(session.client());
        let stats = service.stats(&args.code).await.ok_or_else(|| {
            ShortlyError::api(404, format!("No statistics for code '{}'", args.code))
        })?;

        self.ui.card(
            "URL statistics",
            vec![
                ("Code", args.code),
                ("Clicks", stats.click_count.to_string()),
                ("Last accessed", self.ui.format_field(stats.last_accessed)),
            ],
        );
        Ok(())
    }

    /// Handle config command
    async fn handle_config(&mut self, args: ConfigArgs) -> Result<()> {
        let config = self.load_config()?;
        let mut service = if let Some(path) = self.config_path.clone() {
            ConfigService::with_config_path(config, path)
        } else {
            ConfigService::new(config)
        };

        match args.command {
            ConfigCommand::Show => {
                let config = service.config();
                self.ui.card(
                    "Configuration",
                    vec![
                        ("Endpoint", config.base_url.clone()),
                        ("Timeout (ms)", config.timeout.to_string()),
                        ("Token lifetime (ms)", config.token_lifetime.to_string()),
                        ("App name", config.app_name.clone()),
                        (
                            "Storage dir",
                            config.storage_dir.to_string_lossy().to_string(),
                        ),
                    ],
                );
            }
            ConfigCommand::SetEndpoint { url } => {
                service.set_endpoint(url).await?;
                self.ui.success("Endpoint updated");
            }
            ConfigCommand::SetTimeout { millis } => {
                service.set_timeout(millis).await?;
                self.ui.success("Timeout updated");
            }
            ConfigCommand::Reset => {
                service.reset().await?;
                self.ui.success("Configuration reset to defaults");
            }
        }
        Ok(())
    }
}
