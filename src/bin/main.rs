//! mimivault CLI
//!
//!   mimivault status             → {"vault_exists": true, "vault_id": "…"}
//!   mimivault reset              → wipe the persisted vault flag and identifier
//!   mimivault repl               → drive the keypad, onboarding and ledger interactively
//!   mimivault serve              → HTTP router on --port
//!
//! Configuration comes from flags, then `MIMI_*` env vars, then `.env`.
//!
//! Output format:
//!   --json     Output compact JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use anyhow::{anyhow, bail, Context};
use mimivault::auth::{Key, VaultStore};
use mimivault::enrollment::{Camera, ScriptedCamera};
use mimivault::error::VaultError;
use mimivault::ledger::StatusFilter;
use mimivault::logging::init_logging;
use mimivault::session::SetupKind;
use mimivault::{VaultConfig, VaultNode};
use serde_json::{json, Value};
use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("mimivault {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("status") => cmd_status(&opts),
        Some("reset") => cmd_reset(&opts),
        Some("repl") => cmd_repl(&opts),
        Some("serve") => cmd_serve(&opts),
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || (!opts.json && io::stdout().is_terminal());
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            let code = e.downcast_ref::<VaultError>().map(VaultError::code).unwrap_or("cli");
            let err = json!({"error": format!("{:#}", e), "code": code});
            eprintln!("{}", render(&err, pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    app: Option<String>,
    root: Option<String>,
    enclave: Option<String>,
    port: Option<u16>,
    simulate_camera: bool,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv();

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--simulate-camera" => opts.simulate_camera = true,
                "--app" | "-a" => {
                    if i + 1 < args.len() {
                        opts.app = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--root" | "-d" => {
                    if i + 1 < args.len() {
                        opts.root = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--enclave" | "-e" => {
                    if i + 1 < args.len() {
                        opts.enclave = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        opts.port = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        if opts.port.is_none() {
            opts.port = env::var("MIMI_PORT").ok().and_then(|s| s.parse().ok());
        }
        if !opts.simulate_camera {
            opts.simulate_camera = env::var("MIMI_SIMULATED_CAMERA").map(|v| v == "1").unwrap_or(false);
        }
        opts
    }

    /// Env config with flags layered on top.
    fn config(&self) -> anyhow::Result<VaultConfig> {
        let mut config = VaultConfig::from_env().context("reading MIMI_* environment")?;
        if let Some(app) = &self.app {
            config.app = app.clone();
        }
        if let Some(root) = &self.root {
            config.root = Some(root.into());
        }
        if let Some(url) = &self.enclave {
            config.enclave_url = Some(url.clone());
        }
        Ok(config)
    }
}

fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key.trim()).is_err() {
                env::set_var(key.trim(), value);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"mimivault - dual-mode vault session

USAGE:
    mimivault <command> [options]

COMMANDS:
    status                  Show persisted vault state
    reset                   Factory reset (clears vault flag and identifier)
    repl                    Interactive session
    serve                   Start HTTP server

OPTIONS:
    --app, -a <name>        Application name (env: MIMI_APP)
    --root, -d <path>       Storage root (env: MIMI_ROOT)
    --enclave, -e <url>     Signing enclave base URL (env: MIMI_ENCLAVE_URL)
    --port, -p <port>       Server port (default: 8080, env: MIMI_PORT)
    --simulate-camera       Attach a simulated camera for face enrollment
    --json | --pretty       Output format

ENVIRONMENT:
    MIMI_PRIMARY_PIN, MIMI_DURESS_PIN, MIMI_PIN_DELAY_MS, MIMI_BOOT_DELAY_MS,
    MIMI_ENCLAVE_TIMEOUT_MS, MIMI_MOTION_THRESHOLD, MIMI_LOG_JSON, RUST_LOG
"#
    );
}

fn cmd_status(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let config = opts.config()?;
    let root = config.resolved_root();
    let store = VaultStore::load(&root, &config.app)?;
    Ok(json!({
        "app": config.app,
        "path": store.path().display().to_string(),
        "vault_exists": store.exists(),
        "vault_id": store.vault_id(),
        "enclave": config.enclave_url,
    }))
}

fn cmd_reset(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let config = opts.config()?;
    let mut store = VaultStore::load(&config.resolved_root(), &config.app)?;
    let existed = store.exists();
    store.clear()?;
    info!(app = %config.app, "vault state cleared");
    Ok(json!({"status": "reset", "had_vault": existed}))
}

fn build_node(opts: &ParsedArgs) -> anyhow::Result<VaultNode> {
    let config = opts.config()?;
    let camera: Option<Arc<dyn Camera>> = if opts.simulate_camera {
        Some(Arc::new(ScriptedCamera::moving_head(Duration::from_millis(33))))
    } else {
        None
    };
    let signer = mimivault::node::default_signer(&config)?;
    Ok(VaultNode::from_parts(config, signer, camera)?)
}

fn cmd_repl(opts: &ParsedArgs) -> anyhow::Result<Value> {
    println!("mimivault REPL - type 'help' or 'quit'\n");

    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
    let node = build_node(opts)?;
    let view = rt.block_on(node.boot())?;
    println!("{}", render(&serde_json::to_value(view)?, true));

    loop {
        print!("mimi> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let parts: Vec<&str> = input.splitn(3, ' ').collect();
        let command = parts[0];
        if matches!(command, "quit" | "exit" | "q") {
            break;
        }
        if matches!(command, "help" | "?") {
            print_repl_help();
            continue;
        }

        match rt.block_on(repl_command(&node, command, &parts[1..])) {
            Ok(value) => println!("{}", render(&value, true)),
            Err(e) => println!("Error: {:#}", e),
        }
    }

    rt.block_on(node.stop_enrollment());
    println!("Goodbye!");
    Ok(json!({"status": "exited"}))
}

fn print_repl_help() {
    println!("Commands:");
    println!("  view                      - Current screen");
    println!("  key <0-9|clear|back>      - Press one keypad key");
    println!("  pin <dddd>                - Type a whole PIN");
    println!("  setup <standard|guided>   - Create a vault");
    println!("  ack-id | ack-seed         - Continue onboarding");
    println!("  scan | scan-stop          - Face enrollment");
    println!("  recover [<vault id>]      - Enter recovery / submit an identifier");
    println!("  cancel                    - Leave recovery");
    println!("  balance | history [status] | notes");
    println!("  read <id> | read-all      - Mark notifications read");
    println!("  send <amount> <recipient> - Draft a transfer");
    println!("  confirm | back | authorize <password> | abort");
    println!("  logout | reset | quit");
}

async fn repl_command(node: &VaultNode, command: &str, args: &[&str]) -> anyhow::Result<Value> {
    let arg = |i: usize, usage: &str| -> anyhow::Result<String> {
        args.get(i).map(|s| s.to_string()).ok_or_else(|| anyhow!("Usage: {}", usage))
    };
    let view = |v| -> anyhow::Result<Value> { Ok(serde_json::to_value::<mimivault::session::SessionView>(v)?) };

    match command {
        "view" => view(node.view().await),
        "key" => {
            let raw = arg(0, "key <0-9|clear|back>")?;
            let key = Key::parse(&raw).ok_or_else(|| anyhow!("unknown key: {}", raw))?;
            node.press(key).await?;
            view(node.view().await)
        }
        "pin" => {
            node.enter_pin(&arg(0, "pin <dddd>")?).await?;
            view(node.view().await)
        }
        "setup" => {
            let kind = match arg(0, "setup <standard|guided>")?.as_str() {
                "standard" => SetupKind::Standard,
                "guided" => SetupKind::Guided,
                other => bail!("unknown setup kind: {}", other),
            };
            view(node.begin_setup(kind).await?)
        }
        "ack-id" => view(node.acknowledge_identity().await?),
        "ack-seed" => view(node.acknowledge_seed().await?),
        "scan" => {
            node.start_enrollment().await?;
            loop {
                tokio::time::sleep(Duration::from_millis(250)).await;
                let Some(snap) = node.enrollment_status().await else { break };
                debug!(progress = snap.progress(), "scan");
                println!("  {:>5.1}%  {}", snap.progress(), snap.instruction());
                if snap.is_enrolled() || snap.status != mimivault::enrollment::EnrollmentStatus::Scanning {
                    break;
                }
            }
            // completion is applied by the node's watcher
            tokio::time::sleep(Duration::from_millis(50)).await;
            view(node.view().await)
        }
        "scan-stop" => {
            let snap = node.stop_enrollment().await.ok_or_else(|| anyhow!("no scan running"))?;
            Ok(json!({"progress": snap.progress(), "instruction": snap.instruction()}))
        }
        "recover" => match args.first() {
            None => view(node.begin_recovery().await?),
            Some(_) => view(node.submit_recovery(&args.join(" ")).await?),
        },
        "cancel" => view(node.cancel_recovery().await?),
        "balance" => Ok(json!({"balance": format!("{:.2}", node.balance().await?), "asset": mimivault::ledger::ASSET})),
        "history" => {
            let raw = args.first().copied().unwrap_or("all");
            let filter = StatusFilter::from_str(raw).ok_or_else(|| anyhow!("unknown status: {}", raw))?;
            Ok(serde_json::to_value(node.transactions(filter).await?)?)
        }
        "notes" => Ok(serde_json::to_value(node.notifications().await?)?),
        "read" => {
            let id: u64 = arg(0, "read <id>")?.parse().context("notification id")?;
            Ok(json!({"found": node.mark_read(id).await?}))
        }
        "read-all" => Ok(json!({"changed": node.mark_all_read().await?})),
        "send" => view(node.draft_transfer(&arg(0, "send <amount> <recipient>")?, &arg(1, "send <amount> <recipient>")?).await?),
        "confirm" => view(node.confirm_transfer().await?),
        "back" => view(node.transfer_back().await?),
        "abort" => view(node.cancel_transfer().await),
        "authorize" => {
            let password = args.join(" ");
            Ok(serde_json::to_value(node.authorize_transfer(&password).await?)?)
        }
        "logout" => view(node.logout().await?),
        "reset" => view(node.factory_reset().await?),
        other => bail!("Unknown: {}. Type 'help'.", other),
    }
}

fn cmd_serve(opts: &ParsedArgs) -> anyhow::Result<Value> {
    use mimivault::install_signal_handlers;
    use mimivault::server::create_router_with_name;

    let port = opts.port.unwrap_or(8080);
    let node = build_node(opts)?;
    let app_name = node.config().app.clone();

    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;

    rt.block_on(async {
        let shutdown = install_signal_handlers();

        node.boot().await?;
        let router = create_router_with_name(node.clone(), &app_name);
        let addr = format!("0.0.0.0:{}", port);

        info!("mimivault server listening on http://{}", addr);
        info!("  GET  /health              - Health check");
        info!("  GET  /session             - Current screen");
        info!("  POST /session/pin         - Enter PIN");
        debug!("  /onboarding/*, /enrollment/*, /ledger/*");

        let listener = tokio::net::TcpListener::bind(&addr).await.context("Failed to bind")?;

        let signal = shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.wait().await })
            .await
            .context("Server error")?;

        info!("Shutdown signal received, stopping server...");
        node.stop_enrollment().await;
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(json!({"status": "stopped"}))
}
