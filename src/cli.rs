use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use console::Term;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::dashboard::{DashboardState, Poller, StatusFetcher};
use crate::output::{dim, print_dashboard, FetchProgress};
use crate::pipeline::navigation_target;

#[derive(Parser)]
#[command(name = "devopslab")]
#[command(author, version, about = "Deployment patterns lab and Jenkins pipeline dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API service
    Serve {
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        #[arg(long, env = "JENKINS_URL")]
        jenkins_url: Option<String>,

        #[arg(long, env = "JENKINS_USER")]
        jenkins_user: Option<String>,

        #[arg(long, env = "JENKINS_TOKEN", hide_env_values = true)]
        jenkins_token: Option<String>,

        /// Jenkins job to monitor; repeat or comma-separate for several
        #[arg(short, long = "job", env = "JENKINS_JOBS", value_delimiter = ',')]
        jobs: Vec<String>,
    },

    /// Fetch pipeline status once and render it
    Status {
        #[command(flatten)]
        api: ApiArgs,

        /// Print the raw status response as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(short, long, default_value_t = false, requires = "json")]
        pretty: bool,
    },

    /// Poll pipeline status and re-render on every update
    Watch {
        #[command(flatten)]
        api: ApiArgs,

        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Print the Jenkins URL a pipeline card links to
    Open {
        pipeline: String,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Write a default configuration file
    InitConfig {
        /// Defaults to the platform config location
        path: Option<PathBuf>,

        #[arg(short, long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Args)]
struct ApiArgs {
    /// Base URL of the API service
    #[arg(short = 'u', long, env = "DEVOPSLAB_API_URL")]
    api_url: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }

    fn status_fetcher(config: &Config, api: &ApiArgs) -> Result<StatusFetcher> {
        let api_url = api.api_url.as_deref().unwrap_or(&config.dashboard.api_url);
        Ok(StatusFetcher::new(api_url, config.dashboard.request_timeout())?)
    }

    async fn execute_serve(&self, overrides: ServeOverrides<'_>) -> Result<()> {
        let mut config = self.load_config()?;
        overrides.apply(&mut config);

        info!("Starting DevOpsLab API service on port {}", config.server.port);
        crate::server::start_server(&config).await?;

        Ok(())
    }

    async fn execute_status(&self, api: &ApiArgs, json: bool, pretty: bool) -> Result<()> {
        let config = self.load_config()?;
        let fetcher = Self::status_fetcher(&config, api)?;

        if json {
            let response = fetcher.fetch().await?;
            let json_output = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{json_output}");
            return Ok(());
        }

        let progress = FetchProgress::start(fetcher.endpoint().as_str());
        let mut poller = Poller::new(fetcher, config.dashboard.poll_interval());
        poller.fetch_status().await;
        progress.finish(poller.state().error.is_none());

        print_dashboard(poller.state());
        Ok(())
    }

    async fn execute_watch(&self, api: &ApiArgs, interval: Option<u64>) -> Result<()> {
        let config = self.load_config()?;
        let fetcher = Self::status_fetcher(&config, api)?;
        let interval = interval
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or_else(|| config.dashboard.poll_interval());

        let term = Term::stdout();
        let render = |state: &DashboardState| redraw(&term, state);
        render(&DashboardState::default());

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        };

        let last = Poller::new(fetcher, interval).run(shutdown, render).await;
        info!("Stopped watching after {} polls", last.latest_applied());

        Ok(())
    }

    async fn execute_open(&self, pipeline: &str, api: &ApiArgs) -> Result<()> {
        let config = self.load_config()?;
        let mut poller = Poller::new(Self::status_fetcher(&config, api)?, config.dashboard.poll_interval());
        poller.fetch_status().await;

        let state = poller.state();
        if let Some(error) = &state.error {
            bail!("{error}");
        }

        let Some(found) = state.pipelines.iter().find(|p| p.name == pipeline) else {
            let known: Vec<_> = state.pipelines.iter().map(|p| p.name.as_str()).collect();
            bail!("Pipeline '{pipeline}' is not monitored (known: {})", known.join(", "));
        };

        let host = state.jenkins_host.as_deref().unwrap_or_default();
        println!("{}", navigation_target(found, host));

        Ok(())
    }

    fn execute_init_config(path: Option<&PathBuf>, force: bool) -> Result<()> {
        let path = match path {
            Some(path) => path.clone(),
            None => Config::user_config_path().context("Could not determine the platform config directory")?,
        };

        if path.exists() && !force {
            bail!("{} already exists; pass --force to overwrite it", path.display());
        }

        Config::default().save(&path)?;
        info!("Default configuration written to: {}", path.display());
        println!("{}", path.display());

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve {
                port,
                database_url,
                jenkins_url,
                jenkins_user,
                jenkins_token,
                jobs,
            } => {
                self.execute_serve(ServeOverrides {
                    port: *port,
                    database_url: database_url.as_deref(),
                    jenkins_url: jenkins_url.as_deref(),
                    jenkins_user: jenkins_user.as_deref(),
                    jenkins_token: jenkins_token.as_deref(),
                    jobs,
                })
                .await
            }
            Commands::Status { api, json, pretty } => self.execute_status(api, *json, *pretty).await,
            Commands::Watch { api, interval } => self.execute_watch(api, *interval).await,
            Commands::Open { pipeline, api } => self.execute_open(pipeline, api).await,
            Commands::InitConfig { path, force } => Self::execute_init_config(path.as_ref(), *force),
        }
    }
}

/// Clears the terminal and prints the dashboard. A failed clear only leaves
/// the previous frame on screen.
fn redraw(term: &Term, state: &DashboardState) {
    if let Err(e) = term.clear_screen() {
        debug!("Could not clear the terminal: {e}");
    }
    print_dashboard(state);
    eprintln!("{}", dim("Press Ctrl+C to stop"));
}

/// `serve` flags that take precedence over the configuration file.
struct ServeOverrides<'a> {
    port: Option<u16>,
    database_url: Option<&'a str>,
    jenkins_url: Option<&'a str>,
    jenkins_user: Option<&'a str>,
    jenkins_token: Option<&'a str>,
    jobs: &'a [String],
}

impl ServeOverrides<'_> {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = self.database_url {
            config.server.database_url = Some(url.to_string());
        }
        if let Some(url) = self.jenkins_url {
            config.jenkins.url = url.to_string();
        }
        if let Some(user) = self.jenkins_user {
            config.jenkins.user = Some(user.to_string());
        }
        if let Some(token) = self.jenkins_token {
            config.jenkins.token = Some(token.to_string());
        }
        let jobs: Vec<String> = self
            .jobs
            .iter()
            .map(|job| job.trim().to_string())
            .filter(|job| !job.is_empty())
            .collect();
        if !jobs.is_empty() {
            config.jenkins.jobs = jobs;
        }
    }
}
