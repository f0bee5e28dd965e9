// command line interface

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::Result;

use crate::core::{DEFAULT_DANGEROUS_KEYWORDS, DEFAULT_ROW_LIMIT, Pipeline, SafetyPolicy};
use crate::output::Output;
use crate::{Ai, Db, Provider, Safety, Server};

#[derive(Parser)]
#[command(name = "sqlgate", about = "Natural language to SQL, behind a safety gate")]
struct Cli {
    #[command(flatten)]
    safety: SafetyArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SafetyArgs {
    /// rows appended as LIMIT to unbounded selects
    #[arg(
        long,
        env = "DEFAULT_ROW_LIMIT",
        default_value_t = DEFAULT_ROW_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    row_limit: u32,

    /// keyword that blocks a statement (repeatable, replaces the defaults)
    #[arg(
        long = "dangerous-keyword",
        env = "DANGEROUS_KEYWORDS",
        value_delimiter = ',',
        global = true
    )]
    dangerous_keywords: Vec<String>,
}

impl SafetyArgs {
    fn safety(&self) -> Safety {
        // "drop table, grant" splits into padded pieces
        let keywords: Vec<&str> = self
            .dangerous_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let policy = if keywords.is_empty() {
            SafetyPolicy::new(DEFAULT_DANGEROUS_KEYWORDS, self.row_limit)
        } else {
            SafetyPolicy::new(keywords, self.row_limit)
        };
        Safety::new(policy)
    }
}

#[derive(Args)]
struct ConnectArgs {
    /// database connection url
    #[arg(long, short, env = "DATABASE_URL")]
    db: String,

    /// ai provider
    #[arg(long, short = 'p', env = "LLM_PROVIDER", default_value = "gemini")]
    provider: Provider,

    /// api key for the ai provider
    #[arg(long, short = 'k')]
    api_key: Option<String>,

    /// model name, defaults to the provider's
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,
}

impl ConnectArgs {
    /// A lazy pool defers the first connection until a request needs it.
    async fn pipeline(self, safety: Safety, lazy: bool) -> Result<Pipeline> {
        let ai = Ai::new(self.provider, self.api_key, self.model)?;
        let db = if lazy {
            Db::connect_lazy(&self.db)?
        } else {
            Db::connect(&self.db).await?
        };
        let db = Arc::new(db);
        Ok(Pipeline::new(safety, db.clone(), Arc::new(ai), db))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// start as http server
    Serve {
        #[command(flatten)]
        connect: ConnectArgs,

        /// port number
        #[arg(long, env = "BACKEND_PORT", default_value = "8000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// origin allowed by cors
        #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
        frontend_url: String,
    },

    /// validate a statement without touching a database
    Check {
        /// sql to check
        sql: String,
    },

    /// turn one request into sql, optionally running it
    Ask {
        #[command(flatten)]
        connect: ConnectArgs,

        /// what you want, in plain english
        request: String,

        /// expected statement type (select, insert, update, delete, any)
        #[arg(long, short)]
        operation: Option<String>,

        /// run the statement after it passes validation
        #[arg(long, short)]
        execute: bool,

        /// print results as json
        #[arg(long)]
        raw: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let safety = cli.safety.safety();

    match cli.command {
        Commands::Serve {
            connect,
            port,
            host,
            frontend_url,
        } => {
            // the server comes up without a database and reports it via /health
            let pipeline = connect.pipeline(safety, true).await?;
            if !pipeline.is_connected().await {
                tracing::warn!("database unreachable at startup, serving anyway");
            }
            Ok(Server::run(pipeline, &host, port, &frontend_url).await?)
        }

        Commands::Check { sql } => {
            let validation = safety.validate(&sql);
            Output::validation(&sql, &validation);
            if validation.is_valid {
                Ok(())
            } else {
                Err(miette::miette!("statement rejected"))
            }
        }

        Commands::Ask {
            connect,
            request,
            operation,
            execute,
            raw,
        } => {
            let pipeline = connect.pipeline(safety, false).await?;
            let generation = pipeline.generate(&request, operation.as_deref()).await?;
            Output::generation(&generation);

            if execute {
                // runs the rewritten sql, which the pipeline validates again
                let execution = pipeline.execute(&generation.sql).await?;
                Output::execution(&execution, raw);
            }
            Ok(())
        }
    }
}
