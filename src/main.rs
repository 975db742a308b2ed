use anyhow::Result;
use clap::Parser;
use mall_auth::commands::{self, Options};
use mall_auth::config::{DEFAULT_EXPIRED_CODE, DEFAULT_SUCCESS_CODE, DEFAULT_TIMEOUT_SECS};
use reqwest::Method;
use std::path::PathBuf;

/// mall-auth - authenticated client for the mall API
///
/// Signs in against the admin auth endpoints, keeps the credential on disk and
/// sends authenticated requests, refreshing the access token when the backend
/// reports it expired.
///
/// Examples:
///   mall-auth login admin --password secret
///   mall-auth get /admin/users --query page=1
#[derive(Parser, Debug)]
#[command(author, version = env!("MALL_AUTH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL
    #[arg(
        long = "api-url",
        env = "MALL_API_URL",
        value_name = "URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    pub api_url: String,

    /// Credential file (defaults to <config dir>/mall-auth/auth-storage.json)
    #[arg(long = "storage", env = "MALL_AUTH_STORAGE", value_name = "PATH", global = true)]
    pub storage: Option<PathBuf>,

    /// Business code the backend uses for success
    #[arg(long = "success-code", env = "MALL_SUCCESS_CODE", default_value_t = DEFAULT_SUCCESS_CODE, global = true)]
    pub success_code: i64,

    /// Business code the backend uses for an expired access token
    #[arg(long = "expired-code", env = "MALL_EXPIRED_CODE", default_value_t = DEFAULT_EXPIRED_CODE, global = true)]
    pub expired_code: i64,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Sign in and store the credential
    Login(AccountArgs),

    /// Create an account
    Register(AccountArgs),

    /// Remove the stored credential
    Logout,

    /// Show the stored credential
    Status,

    /// Send an authenticated GET request
    Get(RequestArgs),

    /// Send an authenticated POST request
    Post(RequestArgs),

    /// Send an authenticated PUT request
    Put(RequestArgs),

    /// Send an authenticated DELETE request
    Delete(RequestArgs),
}

#[derive(clap::Args, Debug)]
pub struct AccountArgs {
    #[arg(value_name = "USERNAME")]
    pub username: String,

    #[arg(long, env = "MALL_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// Path relative to the API base URL
    #[arg(value_name = "PATH")]
    pub path: String,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON")]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long, short = 'q', value_name = "KEY=VALUE")]
    pub query: Vec<String>,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            api_url: self.api_url.clone(),
            storage: self.storage.clone(),
            success_code: self.success_code,
            expired_code: self.expired_code,
            timeout_secs: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = mall_auth::runtime::RealRuntime;
    let options = cli.options();

    match cli.command {
        Commands::Login(args) => {
            commands::login(runtime, options, &args.username, &args.password).await?
        }
        Commands::Register(args) => {
            commands::register(runtime, options, &args.username, &args.password).await?
        }
        Commands::Logout => commands::logout(runtime, options)?,
        Commands::Status => commands::status(runtime, options)?,
        Commands::Get(args) => send(runtime, options, Method::GET, args).await?,
        Commands::Post(args) => send(runtime, options, Method::POST, args).await?,
        Commands::Put(args) => send(runtime, options, Method::PUT, args).await?,
        Commands::Delete(args) => send(runtime, options, Method::DELETE, args).await?,
    }
    Ok(())
}

async fn send(
    runtime: mall_auth::runtime::RealRuntime,
    options: Options,
    method: Method,
    args: RequestArgs,
) -> Result<()> {
    commands::call(
        runtime,
        options,
        method,
        &args.path,
        args.data.as_deref(),
        &args.query,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_login_parsing() {
        let cli =
            Cli::try_parse_from(["mall-auth", "login", "admin", "--password", "secret"]).unwrap();
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.username, "admin");
                assert_eq!(args.password, "secret");
            }
            _ => panic!("Expected Login command"),
        }
        assert_eq!(cli.storage, None);
    }

    #[test]
    fn test_cli_get_parsing() {
        let cli = Cli::try_parse_from([
            "mall-auth", "get", "/admin/users", "-q", "page=1", "-q", "size=10",
        ])
        .unwrap();
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.path, "/admin/users");
                assert_eq!(args.query, vec!["page=1", "size=10"]);
                assert_eq!(args.data, None);
            }
            _ => panic!("Expected Get command"),
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "mall-auth",
            "--api-url",
            "http://mall.test",
            "--success-code",
            "200",
            "status",
            "--storage",
            "/tmp/auth.json",
        ])
        .unwrap();

        let options = cli.options();
        assert_eq!(options.api_url, "http://mall.test");
        assert_eq!(options.success_code, 200);
        assert_eq!(options.expired_code, 401);
        assert_eq!(options.storage, Some(PathBuf::from("/tmp/auth.json")));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["mall-auth"]).is_err());
    }
}
