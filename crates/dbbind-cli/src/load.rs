use crate::cli::LoadArgs;
use crate::config::ConfigFile;
use dbbind::{Batch, DbError, FailurePolicy, PgDriver, Record, Session};
use std::path::Path;

pub async fn run(args: LoadArgs) -> anyhow::Result<()> {
    let file = ConfigFile::load_or_default(&args.config, args.database.as_deref())?;
    let url = file.database.url.clone();

    let mut config = file.session_config();
    if let Some(n) = args.chunk_size {
        config.executor.chunk_size = n;
    }
    if args.isolate {
        config.executor.failure_policy = FailurePolicy::Isolate;
    }

    let batch = read_records(&args.file)?;
    let records = batch.len();

    let driver = PgDriver::connect(&url).await?;
    let mut session = Session::with_config(driver, config)?;

    match session.write_many(&args.sql, batch).await {
        Ok(applied) => {
            session.commit().await?;
            println!("{applied} rows affected ({records} records)");
            Ok(())
        }
        Err(DbError::PartialBatch { applied, failures }) => {
            session.commit().await?;
            for f in &failures {
                eprintln!("record {}: {} {}", f.index, f.error, f.record);
            }
            println!("{applied} rows affected ({records} records)");
            anyhow::bail!("{} of {records} records failed", failures.len())
        }
        Err(e) => {
            if let Some(applied) = e.applied_rows() {
                eprintln!("{applied} rows were applied before the failure");
            }
            Err(e.into())
        }
    }
}

/// A JSON array of records, or one record per line for `.jsonl`/`.ndjson` files.
fn read_records(path: &Path) -> anyhow::Result<Batch> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let lines = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl" | "ndjson")
    );
    parse_records(&raw, lines).map_err(|e| anyhow::anyhow!("{}: {e:#}", path.display()))
}

fn parse_records(raw: &str, lines: bool) -> anyhow::Result<Batch> {
    let values: Vec<serde_json::Value> = if !lines {
        serde_json::from_str(raw)?
    } else {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| anyhow::anyhow!("line {}: {e}", i + 1))
            })
            .collect::<anyhow::Result<_>>()?
    };

    let records = values
        .into_iter()
        .map(Record::from_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Batch::from_records(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbbind::Value;

    #[test]
    fn parses_json_array() {
        let batch = parse_records(r#"[{"id": 1, "name": "a"}, {"id": 2, "name": null}]"#, false).unwrap();
        let Batch::Keyed(rows) = batch else {
            panic!("expected keyed records");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], Value::Null);
    }

    #[test]
    fn parses_json_lines() {
        let batch = parse_records("[1, \"a\"]\n\n[2, \"b\"]\n", true).unwrap();
        assert!(matches!(batch, Batch::Positional(ref rows) if rows.len() == 2));

        let batch = parse_records("{\"id\": 1}\n{\"id\": 2}", true).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn reports_bad_lines_and_mixed_shapes() {
        let err = parse_records("{\"id\": 1}\n{oops}", true).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        assert!(parse_records("{\"id\": 1}\n[2]", true).is_err());
        assert!(parse_records("[1, 2]", false).is_err());
    }
}
