use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const THREADS: [&str; 4] = ["main", "http-8080-1", "http-8080-2", "QuartzScheduler_Worker-3"];

const CALLS: [(&str, &str, &str); 5] = [
    ("sailpoint.api.SailPointFactory", "getCurrentContext", ""),
    ("sailpoint.api.Identitizer", "refresh", "identity = Identity[jdoe], options = {promote=true}"),
    ("sailpoint.persistence.HibernatePersistenceManager", "getObjectById", "clazz = class sailpoint.object.Link, id = 4028ab1"),
    ("sailpoint.connector.JDBCConnector", "iterateObjects", "schema = account, filter = null"),
    ("sailpoint.web.BaseBean", "getContext", ""),
];

/// Creates a benchmark log in the default layout with the given number of
/// events: nested Entering/Exiting traces on several threads, plus the
/// occasional ERROR with a stack trace.
fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <number-of-events> <output-file>", args[0]);
        std::process::exit(1);
    }

    let events: usize = match args[1].parse() {
        Ok(events) => events,
        Err(err) => {
            eprintln!("Invalid number of events '{}': {}", args[1], err);
            std::process::exit(1);
        }
    };
    let file_path = &args[2];

    println!("Creating log file with {} events at {}", events, file_path);
    create_benchmark_logs(events, file_path)?;
    println!("Log file created successfully.");

    Ok(())
}

fn create_benchmark_logs(events: usize, file_path: &str) -> io::Result<()> {
    if let Some(parent) = Path::new(file_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = BufWriter::new(File::create(file_path)?);
    let mut millis: usize = 0;
    let mut line = 0;

    // each block is one thread walking down the call chain and back up
    while line < events {
        let thread = THREADS[(line / CALLS.len()) % THREADS.len()];
        let depth = 1 + line % CALLS.len();

        for (class, method, args) in CALLS.iter().take(depth) {
            write_event(&mut file, millis, "DEBUG", thread, class, &format!("Entering {}({})", method, args))?;
            millis += 3;
            line += 1;
        }

        if line % 7 == 0 {
            let (class, _, _) = CALLS[depth - 1];
            write_event(&mut file, millis, "ERROR", thread, class, "Unable to load object")?;
            writeln!(file, "java.lang.IllegalStateException: connection closed")?;
            writeln!(file, "\tat {}.run({}.java:{})", class, class, 100 + depth)?;
            line += 1;
        }

        for (class, method, _) in CALLS.iter().take(depth).rev() {
            millis += 17 * depth;
            write_event(&mut file, millis, "DEBUG", thread, class, &format!("Exiting {} = ok", method))?;
            line += 1;
        }
    }

    file.flush()
}

fn write_event<W: Write>(
    out: &mut W,
    millis: usize,
    priority: &str,
    thread: &str,
    class: &str,
    message: &str,
) -> io::Result<()> {
    let seconds = millis / 1000;
    writeln!(
        out,
        "2025-03-21 {:02}:{:02}:{:02},{:03} {:>5} {} {}:{} - {}",
        (seconds / 3600) % 24,
        (seconds / 60) % 60,
        seconds % 60,
        millis % 1000,
        priority,
        thread,
        class,
        100 + message.len() % 400,
        message
    )
}
