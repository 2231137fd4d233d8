use anyhow::{Context, Result};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const CSV: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,12/1/2010 8:26,2.55,17850,United Kingdom
536365,71053,WHITE METAL LANTERN,6,12/1/2010 8:26,3.39,17850,United Kingdom
536365,71053,WHITE METAL LANTERN,6,12/1/2010 8:26,3.39,17850,United Kingdom
536366,22633,HAND WARMER UNION JACK,0,12/1/2010 8:28,1.85,17850,United Kingdom
536367,M,Manual,1,12/1/2010 8:34,18000.00,12583,France
C536379,D,Discount,-1,12/1/2010 9:41,27.50,14527,United Kingdom
536414,22139,,56,12/1/2010 11:52,0,,United Kingdom
536415,22140,BAD DATE,1,not-a-date,1.00,,France
";

const CONFIG: &str = "\
name: retail_test
source:
  path: data/online_retail.csv
  encoding: utf-8
warehouse:
  path: warehouse/retail_dwh.duckdb
";

/// A throwaway project directory with a config and a small export.
struct EtlTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl EtlTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("project");
        fs::create_dir_all(root.join("data"))?;
        fs::write(root.join("data/online_retail.csv"), CSV)?;
        fs::write(root.join("retail_dwh.yaml"), CONFIG)?;
        Ok(Self { _tmp: tmp, root })
    }

    fn cli(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("retail-dwh"));
        cmd.current_dir(&self.root);
        cmd.env_remove("RETAIL_DWH_SOURCE_PATH")
            .env_remove("RETAIL_DWH_DB_PATH")
            .env_remove("RETAIL_DWH_TARGET_PATH")
            .env_remove("RETAIL_DWH_PROJECT_DIR");
        cmd
    }

    fn db(&self) -> Result<duckdb::Connection> {
        let path = self.root.join("warehouse/retail_dwh.duckdb");
        duckdb::Connection::open(&path).with_context(|| format!("open {}", path.display()))
    }

    fn count(&self, sql: &str) -> Result<i64> {
        Ok(self.db()?.query_row(sql, [], |row| row.get(0))?)
    }

    fn reports(&self) -> Result<Vec<PathBuf>> {
        let dir = self.root.join("target/batches");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = fs::read_dir(&dir)?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        files.sort();
        Ok(files)
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn test_full_run_loads_staging_and_audit_tables() -> Result<()> {
    let env = EtlTestEnv::new()?;

    env.cli()
        .args(["run", "--mode", "full"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:      SUCCESS"))
        .stdout(predicate::str::contains("Extracted:   8"));

    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.stg_retail_sales")?, 4);
    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.dq_quarantine_sales")?, 2);
    assert_eq!(
        env.count("SELECT COUNT(*) FROM retail_dwh.meta_etl_batch_log WHERE status = 'SUCCESS'")?,
        1
    );
    assert_eq!(
        env.count(
            "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales \
             WHERE invoice_no = 'C536379' AND is_cancellation AND is_return"
        )?,
        1
    );
    assert_eq!(
        env.count(
            "SELECT COUNT(*) FROM retail_dwh.stg_retail_sales \
             WHERE is_guest_purchase AND description = 'UNKNOWN PRODUCT'"
        )?,
        1
    );
    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.meta_batch_lease")?, 0);

    let reports = env.reports()?;
    assert_eq!(reports.len(), 1);
    let report = read_json(&reports[0])?;
    assert_eq!(report["batch"]["status"], "SUCCESS");
    assert_eq!(report["summary"]["rows_staged"], 4);
    assert_eq!(report["summary"]["rows_quarantined"], 2);
    assert_eq!(report["summary"]["rows_dropped"], 2);
    Ok(())
}

#[test]
fn test_incremental_rerun_has_no_new_data() -> Result<()> {
    let env = EtlTestEnv::new()?;
    env.cli().args(["run", "--mode", "full"]).assert().success();

    env.cli()
        .args(["run", "--mode", "incremental"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS_NO_DATA"));

    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.stg_retail_sales")?, 4);
    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.meta_etl_batch_log")?, 2);
    Ok(())
}

#[test]
fn test_incremental_picks_up_newer_rows_only() -> Result<()> {
    let env = EtlTestEnv::new()?;
    env.cli().args(["run", "--mode", "full"]).assert().success();

    let mut csv = CSV.to_string();
    csv.push_str("536500,22423,REGENCY CAKESTAND 3 TIER,2,12/2/2010 10:00,12.75,13047,United Kingdom\n");
    fs::write(env.root.join("data/online_retail.csv"), csv)?;

    env.cli()
        .args(["run", "--mode", "incremental"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted:   1"));

    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.stg_retail_sales")?, 5);
    Ok(())
}

#[test]
fn test_missing_source_fails_and_is_logged() -> Result<()> {
    let env = EtlTestEnv::new()?;
    fs::remove_file(env.root.join("data/online_retail.csv"))?;

    env.cli()
        .args(["run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAILED"));

    assert_eq!(
        env.count("SELECT COUNT(*) FROM retail_dwh.meta_etl_batch_log WHERE status = 'FAILED'")?,
        1
    );
    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.stg_retail_sales")?, 0);

    env.cli()
        .args(["batches"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"));
    Ok(())
}

#[test]
fn test_missing_config_exits_non_zero() -> Result<()> {
    let env = EtlTestEnv::new()?;
    fs::remove_file(env.root.join("retail_dwh.yaml"))?;

    env.cli().args(["run"]).assert().failure();
    assert!(!env.root.join("warehouse").exists());
    Ok(())
}

#[test]
fn test_provision_reports_the_opened_schema() -> Result<()> {
    let env = EtlTestEnv::new()?;
    env.cli()
        .args(["provision"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(schema 'retail_dwh')"));

    assert_eq!(
        env.count("SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'retail_dwh'")?,
        5
    );
    Ok(())
}

#[test]
fn test_quality_command_lists_rule_metrics() -> Result<()> {
    let env = EtlTestEnv::new()?;
    env.cli().args(["run"]).assert().success();

    let report = read_json(&env.reports()?[0])?;
    let batch_id = report["batch"]["batch_id"]
        .as_str()
        .context("batch_id missing from report")?
        .to_string();

    env.cli()
        .args(["quality", "--batch-id", &batch_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("unparseable_dates"))
        .stdout(predicate::str::contains("suspicious_unit_price"))
        .stdout(predicate::str::contains("zero_quantity"))
        .stdout(predicate::str::contains("exact_duplicate"));
    Ok(())
}

#[test]
fn test_env_override_redirects_the_source() -> Result<()> {
    let env = EtlTestEnv::new()?;
    let elsewhere = env.root.join("elsewhere.csv");
    fs::rename(env.root.join("data/online_retail.csv"), &elsewhere)?;

    env.cli()
        .env("RETAIL_DWH_SOURCE_PATH", &elsewhere)
        .args(["run"])
        .assert()
        .success();
    assert_eq!(env.count("SELECT COUNT(*) FROM retail_dwh.stg_retail_sales")?, 4);
    Ok(())
}

#[test]
fn test_clean_removes_target() -> Result<()> {
    let env = EtlTestEnv::new()?;
    env.cli().args(["run"]).assert().success();
    assert!(env.root.join("target").exists());

    env.cli().args(["clean"]).assert().success();
    assert!(!env.root.join("target").exists());
    assert!(env.root.join("warehouse/retail_dwh.duckdb").exists());
    Ok(())
}
