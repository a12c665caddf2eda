//! CLI interface for slakctl - Slack from the terminal.

use std::env;
use std::io::{self, BufRead as _, IsTerminal, Write as _};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use log::{LevelFilter, debug};
use serde_json::json;
use slakctl_core::paths::write_default_config;
use slakctl_core::slack::{Channel, DEFAULT_CHANNEL_CAP, Message, SearchResults, mask_secret};
use slakctl_core::{
    AppConfig, AppPaths, ClientOptions, CredentialStore, FetchOptions, OAuthClient, OAuthConfig,
    SlackClient, generate_schema,
};

const APP_NAME: &str = "slakctl";
const REPO_URL: &str = "https://github.com/slakctl/slakctl";

fn main() -> anyhow::Result<()> {
    try_main()
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Auth { subcommand } => rt.block_on(handle_auth(&ctx, subcommand)),
        Command::Channel { subcommand } => rt.block_on(handle_channel(&ctx, subcommand)),
        Command::Search(cmd) => rt.block_on(handle_search(&ctx, cmd)),
        Command::Post { channel, message } => rt.block_on(handle_post(&ctx, &channel, &message)),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "slakctl",
    author,
    version,
    about = "Slack from the terminal",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

/// Common CLI options shared across all subcommands.
#[derive(Debug, Clone, Args)]
pub struct CommonOpts {
    /// Override the config file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Reduce output to only errors.
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    pub quiet: bool,
    /// Increase logging verbosity (stackable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Enable trace logging.
    #[arg(long, global = true)]
    pub trace: bool,
    /// Output machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,
    /// Disable ANSI colors in output.
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    pub no_color: bool,
    /// Control color output.
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    pub color: ColorOption,
    /// Do not change anything on disk.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,
    /// Assume "yes" for interactive prompts.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
    /// Detect terminal capabilities automatically.
    Auto,
    /// Always emit ANSI color codes.
    Always,
    /// Never emit ANSI color codes.
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authentication (token, OAuth, status, logout).
    Auth {
        #[command(subcommand)]
        subcommand: AuthSubcommand,
    },
    /// Channel operations.
    Channel {
        #[command(subcommand)]
        subcommand: ChannelSubcommand,
    },
    /// Search messages across the workspace, newest first.
    Search(SearchCommand),
    /// Post a message to a channel.
    Post {
        /// Channel name (with or without '#') or ID.
        channel: String,
        /// Message text.
        message: String,
    },
    /// Create config directories and default files.
    Init(InitCommand),
    /// Inspect and manage configuration and stored credentials.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum AuthSubcommand {
    /// Store a token after verifying it with Slack.
    Token {
        /// Bot or user token (xoxb-/xoxp-). Prompted for when omitted.
        token: Option<String>,
    },
    /// Obtain a token through the OAuth flow in the browser.
    Oauth {
        /// Seconds to wait for the browser redirect (default from config).
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
    /// Check the stored token against Slack.
    Status,
    /// Remove the stored token.
    Logout,
}

#[derive(Debug, Clone, Subcommand)]
enum ChannelSubcommand {
    /// List channels you can see.
    List(ChannelListCommand),
}

#[derive(Debug, Clone, Copy, Args)]
struct ChannelListCommand {
    /// Fetch every channel instead of stopping at the limit.
    #[arg(short, long)]
    all: bool,
    /// Include archived channels.
    #[arg(long)]
    archived: bool,
    /// Maximum number of channels (default: 1000).
    #[arg(short = 'n', long, value_name = "N", conflicts_with = "all")]
    limit: Option<NonZeroUsize>,
    /// Do not print fetch progress.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Debug, Clone, Args)]
struct SearchCommand {
    /// Keyword or Slack search query.
    keyword: String,
    /// Number of messages to return.
    #[arg(
        short,
        long,
        default_value_t = 20,
        value_parser = clap::value_parser!(u16).range(1..=1000)
    )]
    count: u16,
    /// Output format: text, json, or a template such as "{channel}: {text}".
    #[arg(short, long, default_value = "text")]
    format: String,
    /// Do not print fetch progress.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Debug, Clone, Copy, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists.
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration and masked credentials.
    Show,
    /// Print the resolved config file path.
    Path,
    /// Print all resolved paths.
    Paths,
    /// Print the JSON schema.
    Schema,
    /// Regenerate the default configuration file.
    Reset,
    /// Store the Slack app's OAuth client credentials.
    Set {
        /// OAuth client ID. Prompted for when omitted.
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret. Prompted for when omitted.
        #[arg(long)]
        client_secret: Option<String>,
    },
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.as_deref())?;
        let config = AppConfig::load(&paths, common.dry_run)?;
        let paths = paths.apply_overrides(&config)?;
        let ctx = Self {
            common,
            paths,
            config,
        };
        ctx.ensure_directories()?;
        Ok(ctx)
    }

    fn init_logging(&self) -> Result<()> {
        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        builder.filter_level(self.effective_log_level());

        let force_color = matches!(self.common.color, ColorOption::Always)
            || env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.common.no_color
            || matches!(self.common.color, ColorOption::Never)
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        builder.try_init().or_else(|err| {
            if self.common.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self.config.logging.level.into(),
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    fn ensure_directories(&self) -> Result<()> {
        if self.common.dry_run {
            self.paths.log_dry_run();
            return Ok(());
        }
        self.paths.ensure_directories()
    }

    fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.paths.credentials_file())
    }

    fn client_for(&self, token: String) -> Result<SlackClient> {
        Ok(SlackClient::with_options(
            token,
            ClientOptions::from_config(&self.config),
        )?)
    }

    fn slack_client(&self) -> Result<SlackClient> {
        let token = self.credentials().load_token()?;
        self.client_for(token)
    }

    const fn show_progress(&self, disabled: bool) -> bool {
        !(disabled || self.common.quiet || self.common.json)
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

async fn handle_auth(ctx: &RuntimeContext, cmd: AuthSubcommand) -> Result<()> {
    let store = ctx.credentials();

    match cmd {
        AuthSubcommand::Token { token } => {
            let token = match token {
                Some(token) => token.trim().to_string(),
                None => prompt("Enter your Slack token: ")?,
            };
            if token.is_empty() {
                bail!("token cannot be empty");
            }

            let identity = ctx
                .client_for(token.clone())?
                .auth_test()
                .await
                .context("authentication failed")?;

            if ctx.common.dry_run {
                log::info!("dry-run: would save token to {}", store.path().display());
            } else {
                store.save_token(&token).context("saving token")?;
            }
            println!(
                "Authenticated as {} on {}. Token saved.",
                identity.user, identity.team
            );
            Ok(())
        }
        AuthSubcommand::Oauth { timeout } => {
            let creds = store.load()?;
            if !creds.has_app_credentials() {
                bail!("Slack app credentials not configured. Run 'slakctl config set' first");
            }

            let oauth = OAuthClient::new(OAuthConfig::from_app_config(
                &ctx.config,
                creds.client_id,
                creds.client_secret,
            ))
            .context("creating OAuth client")?;
            let pending = oauth.begin().await.context("starting OAuth flow")?;
            let url = pending.url().to_string();

            println!("Opening browser for Slack authorization...");
            if let Err(e) = open::that_detached(&url) {
                log::warn!("could not open browser: {e}");
                println!("Open this URL in your browser to continue:");
            } else {
                println!("If the browser did not open, visit:");
            }
            println!("  {url}");
            println!(
                "Waiting for the redirect on http://{}/callback ...",
                pending.callback_addr()
            );

            let wait = Duration::from_secs(timeout.unwrap_or(ctx.config.slack.callback_timeout));
            let token = pending
                .complete(wait)
                .await
                .context("OAuth authentication failed")?;

            if ctx.common.dry_run {
                log::info!("dry-run: would save token to {}", store.path().display());
            } else {
                store.save_token(&token).context("saving token")?;
            }
            println!("OAuth authentication successful! Token saved.");
            Ok(())
        }
        AuthSubcommand::Status => {
            let Ok(token) = store.load_token() else {
                println!("Not authenticated. Run 'slakctl auth token' or 'slakctl auth oauth'.");
                return Ok(());
            };
            let identity = ctx
                .client_for(token)?
                .auth_test()
                .await
                .context("checking token")?;

            if ctx.common.json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!("Authenticated as: {} ({})", identity.user, identity.user_id);
                println!("Workspace:        {} ({})", identity.team, identity.team_id);
                println!("URL:              {}", identity.url);
            }
            Ok(())
        }
        AuthSubcommand::Logout => {
            if ctx.common.dry_run {
                log::info!("dry-run: would clear token in {}", store.path().display());
            } else {
                store.clear_token()?;
            }
            println!("Logged out.");
            Ok(())
        }
    }
}

async fn handle_channel(ctx: &RuntimeContext, cmd: ChannelSubcommand) -> Result<()> {
    let ChannelSubcommand::List(cmd) = cmd;
    let client = ctx.slack_client()?;

    let cap = if cmd.all {
        0
    } else {
        cmd.limit.map_or(DEFAULT_CHANNEL_CAP, NonZeroUsize::get)
    };
    let mut options = FetchOptions::with_cap(cap).include_archived(cmd.archived);

    let show_progress = ctx.show_progress(cmd.no_progress);
    if show_progress {
        eprintln!("Fetching channels...");
        options = options.on_progress(progress_printer("channels"));
    }

    let channels = client.list_channels(options).await;
    if show_progress {
        eprintln!();
    }
    let channels = channels.context("failed to list channels")?;

    if ctx.common.json {
        println!("{}", serde_json::to_string_pretty(&channels)?);
        return Ok(());
    }

    if channels.is_empty() {
        println!("No channels found");
        return Ok(());
    }

    println!("Found {} channels:\n", channels.len());
    for channel in &channels {
        print_channel(channel);
    }
    Ok(())
}

async fn handle_search(ctx: &RuntimeContext, cmd: SearchCommand) -> Result<()> {
    let client = ctx.slack_client()?;
    let format = SearchFormat::parse(&cmd.format, ctx.common.json);

    let mut options = FetchOptions::with_cap(usize::from(cmd.count));
    let show_progress = ctx.show_progress(cmd.no_progress) && format != SearchFormat::Json;
    if show_progress {
        eprintln!("Searching messages...");
        options = options.on_progress(progress_printer("messages"));
    }

    let results = client.search(&cmd.keyword, options).await;
    if show_progress {
        eprintln!();
    }
    let results = results.context("search failed")?;

    print_search_results(&results, &cmd.keyword, format)
}

async fn handle_post(ctx: &RuntimeContext, channel: &str, message: &str) -> Result<()> {
    let client = ctx.slack_client()?;
    let posted = client
        .post_message(channel, message)
        .await
        .context("failed to post message")?;

    if ctx.common.json {
        println!("{}", serde_json::to_string_pretty(&posted)?);
    } else {
        println!("Message posted successfully to {channel}");
    }
    Ok(())
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }
    if ctx.common.dry_run {
        log::info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }
    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    let store = ctx.credentials();

    match command {
        ConfigCommand::Show => {
            let creds = store.load()?;
            if ctx.common.json {
                let output = json!({
                    "config": ctx.config,
                    "credentials": {
                        "client_id": creds.client_id,
                        "client_secret": masked_or_unset(&creds.client_secret),
                        "token": masked_or_unset(&creds.token),
                    },
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("serializing config to JSON")?
                );
            } else {
                println!("{:#?}", ctx.config);
                println!();
                println!("Client ID: {}", or_unset(&creds.client_id));
                println!("Client Secret: {}", masked_or_unset(&creds.client_secret));
                println!("Token: {}", masked_or_unset(&creds.token));
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Paths => {
            let credentials = ctx.paths.credentials_file();
            if ctx.common.json {
                let paths = json!({
                    "config": ctx.paths.config_file,
                    "data": ctx.paths.data_dir,
                    "credentials": credentials,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&paths).context("serializing paths to JSON")?
                );
            } else {
                println!("config:      {}", ctx.paths.config_file.display());
                println!("data:        {}", ctx.paths.data_dir.display());
                println!("credentials: {}", credentials.display());
            }
            Ok(())
        }
        ConfigCommand::Schema => {
            println!("{}", generate_schema(APP_NAME, REPO_URL)?);
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                log::info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
        ConfigCommand::Set {
            client_id,
            client_secret,
        } => {
            let client_id = match client_id {
                Some(id) => id.trim().to_string(),
                None => prompt("Enter Slack App Client ID: ")?,
            };
            let client_secret = match client_secret {
                Some(secret) => secret.trim().to_string(),
                None => prompt("Enter Slack App Client Secret: ")?,
            };
            if client_id.is_empty() || client_secret.is_empty() {
                bail!("client ID and client secret cannot be empty");
            }

            if ctx.common.dry_run {
                log::info!(
                    "dry-run: would save app credentials to {}",
                    store.path().display()
                );
            } else {
                store
                    .save_app_credentials(&client_id, &client_secret)
                    .context("saving app credentials")?;
            }
            println!("Slack app credentials saved successfully!");
            Ok(())
        }
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

// ─── Input / progress ────────────────────────────────────────────────

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading from stdin")?;
    Ok(line.trim().to_string())
}

/// Renders `Fetched N/M <noun> (elapsed: ...)` on a single stderr line.
fn progress_printer(noun: &'static str) -> impl FnMut(usize, usize) + Send {
    let started = Instant::now();
    move |current, total| {
        let elapsed = started.elapsed();
        if total > 0 {
            eprint!("\rFetched {current}/{total} {noun} (elapsed: {elapsed:.1?})");
        } else {
            eprint!("\rFetched {current} {noun} (elapsed: {elapsed:.1?})");
        }
        let _ = io::stderr().flush();
    }
}

// ─── Formatting helpers ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchFormat<'a> {
    Text,
    Json,
    Template(&'a str),
}

impl<'a> SearchFormat<'a> {
    fn parse(raw: &'a str, force_json: bool) -> Self {
        if force_json {
            return Self::Json;
        }
        match raw {
            "text" => Self::Text,
            "json" => Self::Json,
            template => Self::Template(template),
        }
    }
}

fn print_search_results(
    results: &SearchResults,
    keyword: &str,
    format: SearchFormat<'_>,
) -> Result<()> {
    match format {
        SearchFormat::Json => {
            let output = json!({
                "matches": results.matches,
                "total": results.total,
                "query": keyword,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("serializing results to JSON")?
            );
        }
        SearchFormat::Text => {
            if results.matches.is_empty() {
                println!("No messages found containing '{keyword}'");
                return Ok(());
            }
            println!(
                "Found {} messages containing '{keyword}' (total: {}):\n",
                results.matches.len(),
                results.total
            );
            for message in &results.matches {
                print_message(message);
            }
        }
        SearchFormat::Template(template) => {
            for message in &results.matches {
                println!("{}", format_message(message, template));
            }
        }
    }
    Ok(())
}

fn print_channel(channel: &Channel) {
    println!("ID: {}", channel.id);
    println!("Name: #{}", channel.name);
    if channel.is_archived {
        println!("Status: Archived");
    }
    println!("---");
}

fn print_message(message: &Message) {
    println!("Channel: #{}", message.channel_label());
    println!("User: {}", message.author_label());
    println!("Text: {}", message.text.trim());
    println!("Timestamp: {} ({})", message.ts, format_ts(&message.ts));
    if !message.permalink.is_empty() {
        println!("Link: {}", message.permalink);
    }
    println!("---");
}

/// Expand `{channel} {user} {text} {timestamp} {permalink} {channel_id}
/// {user_id}` and the `\n` / `\t` escapes in one pass, so placeholder-like
/// text inside a message is never expanded again. Unknown placeholders are
/// kept verbatim.
fn format_message(message: &Message, template: &str) -> String {
    let mut out = String::with_capacity(template.len() + message.text.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '\\']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix('\\') {
            match after.chars().next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                _ => {
                    out.push('\\');
                    rest = after;
                    continue;
                }
            }
            rest = &after[1..];
            continue;
        }

        let expanded = rest.find('}').and_then(|end| {
            placeholder(message, &rest[1..end]).map(|value| (value, end))
        });
        match expanded {
            Some((value, end)) => {
                out.push_str(value);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn placeholder<'m>(message: &'m Message, name: &str) -> Option<&'m str> {
    let value = match name {
        "channel" => message.channel_label(),
        "user" => message.author_label(),
        "text" => message.text.trim(),
        "timestamp" => &message.ts,
        "permalink" => &message.permalink,
        "channel_id" => &message.channel.id,
        "user_id" => &message.user,
        _ => return None,
    };
    Some(value)
}

/// Render a Slack `ts` (`seconds.micros`) as local time.
fn format_ts(ts: &str) -> String {
    ts.split('.')
        .next()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || ts.to_string(),
            |dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            },
        )
}

fn masked_or_unset(secret: &str) -> String {
    if secret.is_empty() {
        "Not set".to_string()
    } else {
        mask_secret(secret)
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "Not set" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slakctl_core::LogLevel;
    use slakctl_core::slack::ChannelRef;

    fn message() -> Message {
        Message {
            kind: "message".to_string(),
            text: "  deploy finished {user}  ".to_string(),
            user: "U024BE7LH".to_string(),
            username: "ana".to_string(),
            channel: ChannelRef {
                id: "C024BE91L".to_string(),
                name: "ops".to_string(),
            },
            ts: "1700000000.000100".to_string(),
            permalink: "https://acme.slack.com/archives/C024BE91L/p1700000000000100".to_string(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    fn context(args: &[&str], level: LogLevel) -> RuntimeContext {
        let cli = Cli::try_parse_from(args).expect("parse");
        let mut config = AppConfig::default();
        config.logging.level = level;
        RuntimeContext {
            common: cli.common,
            paths: AppPaths {
                config_file: PathBuf::from("/nonexistent/config.toml"),
                data_dir: PathBuf::from("/nonexistent/data"),
            },
            config,
        }
    }

    #[test]
    fn configured_log_level_applies_without_flags() {
        let ctx = context(&["slakctl", "config", "path"], LogLevel::Debug);
        assert_eq!(ctx.effective_log_level(), LevelFilter::Debug);

        let ctx = context(&["slakctl", "config", "path"], LogLevel::Error);
        assert_eq!(ctx.effective_log_level(), LevelFilter::Error);
    }

    #[test]
    fn verbosity_flags_override_configured_level() {
        let ctx = context(&["slakctl", "-v", "config", "path"], LogLevel::Error);
        assert_eq!(ctx.effective_log_level(), LevelFilter::Info);

        let ctx = context(&["slakctl", "--trace", "config", "path"], LogLevel::Error);
        assert_eq!(ctx.effective_log_level(), LevelFilter::Trace);
    }

    #[test]
    fn template_expands_every_placeholder() {
        let out = format_message(
            &message(),
            "{channel}|{channel_id}|{user}|{user_id}|{timestamp}|{permalink}",
        );
        assert_eq!(
            out,
            "ops|C024BE91L|ana|U024BE7LH|1700000000.000100|https://acme.slack.com/archives/C024BE91L/p1700000000000100"
        );
    }

    #[test]
    fn template_handles_escapes_and_unknown_placeholders() {
        let out = format_message(&message(), r"#{channel}\t{nope}\n{text}\x");
        assert_eq!(out, "#ops\t{nope}\ndeploy finished {user}\\x");
    }

    #[test]
    fn template_does_not_reexpand_message_text() {
        let out = format_message(&message(), "{text}");
        assert_eq!(out, "deploy finished {user}");
    }

    #[test]
    fn template_labels_fall_back_to_ids() {
        let mut msg = message();
        msg.username.clear();
        msg.channel.name.clear();
        assert_eq!(format_message(&msg, "{user}@{channel}"), "U024BE7LH@C024BE91L");
    }

    #[test]
    fn unclosed_brace_is_literal() {
        assert_eq!(format_message(&message(), "{channel"), "{channel");
    }

    #[test]
    fn search_format_selection() {
        assert_eq!(SearchFormat::parse("text", false), SearchFormat::Text);
        assert_eq!(SearchFormat::parse("json", false), SearchFormat::Json);
        assert_eq!(SearchFormat::parse("text", true), SearchFormat::Json);
        assert_eq!(
            SearchFormat::parse("{text}", false),
            SearchFormat::Template("{text}")
        );
    }

    #[test]
    fn ts_formatting_falls_back_to_raw() {
        assert_eq!(format_ts("not-a-ts"), "not-a-ts");
        assert_eq!(format_ts("1700000000.000100").len(), "2023-11-14 22:13:20".len());
    }

    #[test]
    fn search_count_is_bounded() {
        assert!(Cli::try_parse_from(["slakctl", "search", "deploy", "-c", "0"]).is_err());
        assert!(Cli::try_parse_from(["slakctl", "search", "deploy", "-c", "1001"]).is_err());
        let cli = Cli::try_parse_from(["slakctl", "search", "deploy", "-c", "1000"]).expect("parse");
        match cli.command {
            Command::Search(cmd) => assert_eq!(cmd.count, 1000),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn channel_limit_conflicts_with_all() {
        assert!(
            Cli::try_parse_from(["slakctl", "channel", "list", "--all", "--limit", "5"]).is_err()
        );
        assert!(Cli::try_parse_from(["slakctl", "channel", "list", "--limit", "0"]).is_err());
    }

    #[test]
    fn credentials_display_is_masked() {
        assert_eq!(masked_or_unset(""), "Not set");
        assert_eq!(masked_or_unset("xoxp-1234-abcd"), "xoxp****abcd");
        assert_eq!(or_unset("123.456"), "123.456");
    }
}
