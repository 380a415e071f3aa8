use clap::Parser;
use pgarchive::{load, Value};
use std::path::PathBuf;
use std::process::ExitCode;

/// Inspect, extract data from, and re-save PostgreSQL pg_dump custom-format archives.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Archive files to inspect.
    paths: Vec<PathBuf>,

    /// Print every row of the given `schema.table` TABLE DATA entry to stdout.
    #[arg(long, value_name = "SCHEMA.TABLE")]
    dump_table: Option<String>,

    /// Re-save the archive to this path after loading it.
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut ok = true;

    for path in &args.paths {
        match load(path, None) {
            Ok(mut archive) => {
                println!("{}: {archive}", path.display());

                if let Some(spec) = &args.dump_table {
                    if let Some((schema, table)) = spec.split_once('.') {
                        match archive.table_data(schema, table) {
                            Ok(rows) => {
                                for row in rows {
                                    match row {
                                        Ok(values) => println!("{}", format_row(&values)),
                                        Err(e) => {
                                            eprintln!("error reading row: {e}");
                                            ok = false;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                eprintln!("can not read table data for {spec}: {e}");
                                ok = false;
                            }
                        }
                    } else {
                        eprintln!("--dump-table expects SCHEMA.TABLE, got {spec:?}");
                        ok = false;
                    }
                }

                if let Some(dest) = &args.save {
                    if let Err(e) = archive.save(dest) {
                        eprintln!("can not save archive to {}: {e}", dest.display());
                        ok = false;
                    }
                }
            }
            Err(e) => {
                eprintln!("can not read {}: {}", path.display(), e);
                ok = false;
            }
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn format_row(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::Null => "\\N".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bytes(b) => format!("\\x{}", hex::encode(b)),
            Value::Ip(ip) => ip.to_string(),
            Value::IpNetwork(n) => n.to_string(),
            Value::Uuid(u) => u.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::Decimal(d) => d.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\t")
}
