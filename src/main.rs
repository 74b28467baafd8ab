use sqldal::describe::describe;
use sqldal::sql::{add_sql_to_schema, Dialect};
use sqldal::Schema;
use std::env;
use std::fs;
use std::process;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <schema.sql> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --compare <file>   Report discrepancies against another schema");
    eprintln!("  -d, --dialect <name>   postgres, oracle, sqlite (default: postgres)");
    eprintln!("  -v, --verbose          Log compiled statements");
    process::exit(1);
}

#[cfg(not(target_arch = "wasm32"))]
fn init_logging(verbose: bool) {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    if let Err(e) = simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn init_logging(_verbose: bool) {}

fn load(path: &str, dialect: Dialect) -> Schema {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            process::exit(1);
        }
    };
    log::debug!("compiling {} as {}", path, dialect.name());
    let mut schema = Schema::with_dialect(path, dialect);
    if let Err(e) = add_sql_to_schema(&mut schema, &source) {
        eprintln!("{}: {}", path, e);
        process::exit(1);
    }
    schema
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage(&args[0]);
    }

    let input_path = &args[1];
    let mut compare_path: Option<String> = None;
    let mut dialect = Dialect::default();
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--compare" => {
                i += 1;
                if i < args.len() {
                    compare_path = Some(args[i].clone());
                }
            }
            "-d" | "--dialect" => {
                i += 1;
                if i < args.len() {
                    dialect = Dialect::from_str(&args[i]).unwrap_or_else(|| {
                        let names: Vec<&str> = Dialect::ALL.iter().map(|d| d.name()).collect();
                        eprintln!("Invalid dialect: {} (expected {})", args[i], names.join(", "));
                        process::exit(1);
                    });
                }
            }
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => usage(&args[0]),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    init_logging(verbose);

    let schema = load(input_path, dialect);

    match compare_path {
        Some(path) => {
            let other = load(&path, dialect);
            let report = schema.compare(&other);
            for line in &report {
                println!("{}", line);
            }
            if !report.is_empty() {
                process::exit(2);
            }
        }
        None => print!("{}", describe(&schema)),
    }
}
