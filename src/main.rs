// ==========================================
// 研究生培训档案系统 - 批量操作命令行入口
// ==========================================
// 用法: sims-bulk <db_path> <command> [args...]
// 输出: 台账 / 预览以 JSON 写到 stdout, 日志写到 stderr
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use sims_bulk::config::{BulkConfig, ConfigManager};
use sims_bulk::db::read_schema_version;
use sims_bulk::domain::{LogEntryStatus, Principal};
use sims_bulk::engine::{BulkService, ImportOptions};
use sims_bulk::importer::{
    convert_to_trainee_format, generate_trainee_template, preview_trainees, UploadedFile,
};
use sims_bulk::repository::{PersonRepository, SqliteStore};
use sims_bulk::{logging, OperationLedger, Role};
use std::sync::Arc;

const USAGE: &str = "\
用法: sims-bulk <db_path> <command> [args...]

命令:
  init                                   创建/升级数据库表结构
  import-logbook     <file> [flags]      导入日志条目 (.csv/.xlsx/.xls)
  import-supervisors <file> [flags]      导入导师名册
  import-residents   <file> [flags]      导入研究生名册
  import-trainees    <file> [flags]      导入旧版学员表 (.xlsx/.xls)
  review   <status> <id>...              批量设置日志条目状态
  assign   <supervisor_username> <id>... 批量指派导师
  template <out.xlsx>                    生成学员表模板
  convert  <in> <out.xlsx>               转换为学员表格式
  preview  <file>                        预览学员表 (不写入)
  ledger   <id>                          查看台账
  ledgers  [limit]                       列出当前执行人的台账

导入参数:
  --commit            实际写入 (默认试运行)
  --allow-partial     行失败不影响其他行
  --random-passwords  使用随机首登口令

环境变量:
  SIMS_ACTOR          执行人用户名 (默认: $USER)
  RUST_LOG            日志级别 (默认: info)
";

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (db_path, command, rest) = match args.as_slice() {
        [db_path, command, rest @ ..] => (db_path.as_str(), command.as_str(), rest),
        _ => {
            eprint!("{}", USAGE);
            bail!("参数不足");
        }
    };

    tracing::info!(version = sims_bulk::VERSION, db = db_path, command, "{}", sims_bulk::APP_NAME);

    let store = Arc::new(
        SqliteStore::open(db_path).with_context(|| format!("无法打开数据库: {}", db_path))?,
    );

    match command {
        "init" => {
            let conn = store.connection();
            let conn = conn.lock().map_err(|e| anyhow!("锁获取失败: {}", e))?;
            let version = read_schema_version(&conn)?;
            println!("schema_version={}", version.unwrap_or_default());
        }
        "import-logbook" | "import-supervisors" | "import-residents" | "import-trainees" => {
            let (path, options) = parse_import_args(rest)?;
            let file = UploadedFile::from_path(path)?;
            let service = build_service(&store)?;
            let ledger = match command {
                "import-logbook" => service.import_logbook_entries(&file, options)?,
                "import-supervisors" => service.import_supervisors(&file, options)?,
                "import-residents" => service.import_residents(&file, options)?,
                _ => service.import_trainees(&file, options)?,
            };
            print_ledger(&ledger)?;
        }
        "review" => {
            let (status, ids) = rest.split_first().ok_or_else(|| anyhow!("缺少状态参数"))?;
            let status = LogEntryStatus::from_str(&status.to_lowercase())
                .ok_or_else(|| anyhow!("未知状态: {}", status))?;
            let ids = parse_ids(ids)?;
            let ledger = build_service(&store)?.review_entries(&ids, status)?;
            print_ledger(&ledger)?;
        }
        "assign" => {
            let (username, ids) = rest.split_first().ok_or_else(|| anyhow!("缺少导师用户名"))?;
            let supervisor = store
                .find_person_by_username(username)?
                .filter(|p| p.role == Role::Supervisor)
                .ok_or_else(|| anyhow!("导师不存在: {}", username))?;
            let ids = parse_ids(ids)?;
            let ledger = build_service(&store)?.assign_supervisor(&ids, &supervisor)?;
            print_ledger(&ledger)?;
        }
        "template" => {
            let out = rest.first().ok_or_else(|| anyhow!("缺少输出路径"))?;
            std::fs::write(out, generate_trainee_template()?)
                .with_context(|| format!("写入失败: {}", out))?;
            println!("{}", out);
        }
        "convert" => {
            let [input, out] = rest else {
                bail!("用法: convert <in> <out.xlsx>");
            };
            let converted = convert_to_trainee_format(&UploadedFile::from_path(input)?)?;
            std::fs::write(out, converted).with_context(|| format!("写入失败: {}", out))?;
            println!("{}", out);
        }
        "preview" => {
            let path = rest.first().ok_or_else(|| anyhow!("缺少文件路径"))?;
            let config = load_config(&store)?;
            let preview = preview_trainees(
                &UploadedFile::from_path(path)?,
                &config,
                Local::now().date_naive(),
            )?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        "ledger" => {
            let id = rest.first().ok_or_else(|| anyhow!("缺少台账 id"))?;
            let ledger = build_service(&store)?
                .find_ledger(id)?
                .ok_or_else(|| anyhow!("台账不存在: {}", id))?;
            print_ledger(&ledger)?;
        }
        "ledgers" => {
            let limit = match rest.first() {
                Some(raw) => raw.parse().with_context(|| format!("无效数量: {}", raw))?,
                None => 20,
            };
            let ledgers = build_service(&store)?.list_ledgers(limit)?;
            println!("{}", serde_json::to_string_pretty(&ledgers)?);
        }
        other => {
            eprint!("{}", USAGE);
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}

fn load_config(store: &SqliteStore) -> Result<BulkConfig> {
    let manager = ConfigManager::from_connection(store.connection())
        .map_err(|e| anyhow!("配置管理器初始化失败: {}", e))?;
    BulkConfig::load(&manager).map_err(|e| anyhow!("配置加载失败: {}", e))
}

/// 命令行执行人按超级用户处理
fn build_service(store: &Arc<SqliteStore>) -> Result<BulkService<SqliteStore>> {
    let username = std::env::var("SIMS_ACTOR")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "operator".to_string());
    let actor = Principal::superuser(0, username);
    Ok(BulkService::new(Arc::clone(store), actor, load_config(store)?)?)
}

fn parse_import_args(rest: &[String]) -> Result<(&str, ImportOptions)> {
    let mut path = None;
    let mut options = ImportOptions::default();
    for arg in rest {
        match arg.as_str() {
            "--commit" => options.dry_run = false,
            "--allow-partial" => options.allow_partial = true,
            "--random-passwords" => options.generate_passwords = false,
            flag if flag.starts_with("--") => bail!("未知参数: {}", flag),
            value if path.is_none() => path = Some(value),
            value => bail!("多余参数: {}", value),
        }
    }
    let path = path.ok_or_else(|| anyhow!("缺少导入文件路径"))?;
    Ok((path, options))
}

fn parse_ids(raw: &[String]) -> Result<Vec<i64>> {
    raw.iter()
        .map(|s| s.parse::<i64>().with_context(|| format!("无效 id: {}", s)))
        .collect()
}

fn print_ledger(ledger: &OperationLedger) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(ledger)?);
    Ok(())
}
