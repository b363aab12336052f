use avl_collections::avl_tree::{AvlSet, PrintMode};
use log::{info, warn};
use simplelog::{Config, LevelFilter, SimpleLogger};
use std::env;
use std::io::{self, BufRead, Write};

fn parse_mode(arg: Option<&str>) -> Option<PrintMode> {
    match arg.unwrap_or("tree") {
        "pre" | "preorder" => Some(PrintMode::Preorder),
        "in" | "inorder" => Some(PrintMode::Inorder),
        "post" | "postorder" => Some(PrintMode::Postorder),
        "tree" => Some(PrintMode::Tree),
        _ => None,
    }
}

fn run_command(set: &mut AvlSet<i64>, args: &[&str], out: &mut impl Write) -> io::Result<bool> {
    let key = args.get(1).and_then(|arg| arg.parse::<i64>().ok());
    match (args[0], key) {
        ("insert", Some(key)) => writeln!(out, "{}", set.insert(key))?,
        ("remove", Some(key)) => writeln!(out, "{:?}", set.remove(&key))?,
        ("contains", Some(key)) => writeln!(out, "{}", set.contains(&key))?,
        ("succ", Some(key)) => writeln!(out, "{:?}", set.succ(&key))?,
        ("pred", Some(key)) => writeln!(out, "{:?}", set.pred(&key))?,
        ("floor", Some(key)) => writeln!(out, "{:?}", set.floor(&key))?,
        ("ceil", Some(key)) => writeln!(out, "{:?}", set.ceil(&key))?,
        ("min", _) => writeln!(out, "{:?}", set.min())?,
        ("max", _) => writeln!(out, "{:?}", set.max())?,
        ("len", _) => writeln!(out, "{}", set.len())?,
        ("height", _) => writeln!(out, "{}", set.height())?,
        ("clear", _) => set.clear(),
        ("print", _) => match parse_mode(args.get(1).cloned()) {
            Some(mode) => set.print(mode, out)?,
            None => warn!("Unknown print mode: {:?}", args.get(1)),
        },
        ("quit", _) => return Ok(false),
        _ => warn!("Unrecognized command: {}", args.join(" ")),
    }
    Ok(true)
}

fn main() -> io::Result<()> {
    let level = if env::var_os("AVL_TRACE").is_some() {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    if SimpleLogger::init(level, Config::default()).is_err() {
        eprintln!("Logger was already initialized.");
    }

    let mut set = AvlSet::new();
    for arg in env::args().skip(1) {
        match arg.parse::<i64>() {
            Ok(key) => {
                set.insert(key);
            },
            Err(_) => warn!("Skipping non-integer argument: {}", arg),
        }
    }
    info!("Starting with {} keys.", set.len());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line?;
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() {
            continue;
        }
        if !run_command(&mut set, &args, &mut out)? {
            break;
        }
    }
    info!("Exiting with {} keys.", set.len());
    Ok(())
}
