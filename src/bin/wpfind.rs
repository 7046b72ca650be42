//! CLI for running lookup queries against a registry snapshot.
//!
//! Usage:
//!   wpfind <snapshot.json>                      # Start REPL (interactive mode)
//!   wpfind <snapshot.json> -e "query"           # Run one query
//!   wpfind <snapshot.json> --config <file.toml> # Either of the above, with settings

use lazy_webpack::runner::webpack::config::WebpackConfig;
use lazy_webpack::runner::webpack::context::WebpackContext;
use lazy_webpack::runner::webpack::registry::ModuleRegistry;
use lazy_webpack::runner::webpack::snapshot::Snapshot;
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process;

struct Options {
    snapshot: String,
    config: Option<String>,
    query: Option<String>,
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let options = match parse_args(env::args().skip(1).collect()) {
        Some(options) => options,
        None => {
            print_usage();
            process::exit(1);
        }
    };

    let ctx = match load(&options) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match &options.query {
        Some(query) => {
            if !run_query(&ctx, query) {
                process::exit(1);
            }
        }
        None => run_repl(&ctx),
    }
}

fn parse_args(args: Vec<String>) -> Option<Options> {
    let mut snapshot = None;
    let mut config = None;
    let mut query = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-e" | "--eval" => query = Some(args.next()?),
            "-c" | "--config" => config = Some(args.next()?),
            _ if snapshot.is_none() => snapshot = Some(arg),
            _ => return None,
        }
    }
    Some(Options {
        snapshot: snapshot?,
        config,
        query,
    })
}

fn print_usage() {
    eprintln!("wpfind - webpack module lookup");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  wpfind <snapshot.json>                  Start REPL (interactive mode)");
    eprintln!("  wpfind <snapshot.json> -e \"query\"       Run one lookup query");
    eprintln!("  wpfind <snapshot.json> --config <file>  Read [lookup] settings from a TOML file");
    eprintln!();
    eprintln!("Queries look like findByProps(\"getUser\"), findBulk(byProps(\"a\"), byCode(\"b\")),");
    eprintln!("findStore(\"UserStore\"), search(/get\\w+/i) or extract(123).");
}

fn load(options: &Options) -> Result<WebpackContext, Box<dyn std::error::Error>> {
    let config = match &options.config {
        Some(path) => WebpackConfig::load(Path::new(path))?,
        None => WebpackConfig::default(),
    };
    let ctx = WebpackContext::new(config);
    let registry = ModuleRegistry::shared();
    ctx.init_webpack(registry.clone())?;
    Snapshot::load(Path::new(&options.snapshot))?.populate(&registry)?;
    Ok(ctx)
}

fn run_query(ctx: &WebpackContext, query: &str) -> bool {
    match ctx.run_query(query) {
        Ok(result) => {
            println!("{}", result);
            result.is_found()
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

fn run_repl(ctx: &WebpackContext) {
    let modules = ctx.registry().map(|r| r.len()).unwrap_or(0);
    println!("wpfind v0.1.0 - {} modules loaded", modules);
    println!("Type a lookup query and press Enter. Type .exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }

        let input = input.trim();
        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        run_query(ctx, input);
    }

    println!("Goodbye!");
}
