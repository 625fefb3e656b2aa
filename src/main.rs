// ==========================================
// 促销日历对账系统 - 命令行入口
// ==========================================
// 用法: promo-reconcile <weekly> <monthly> <sale> <external> <month> <year> [config.json]
// 输出: 对账结果 (JSON) 打印到标准输出, 日志写到标准错误
// ==========================================

use anyhow::{bail, Context, Result};
use promo_reconcile::config::ConfigManager;
use promo_reconcile::domain::TargetMonth;
use promo_reconcile::engine::ReconcileOrchestrator;
use promo_reconcile::importer::PlanImporter;
use promo_reconcile::logging;

const USAGE: &str =
    "用法: promo-reconcile <weekly.csv> <monthly.csv> <sale.csv> <external.csv> <month> <year> [config.json]";

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 6 || args.len() > 7 {
        bail!("{}", USAGE);
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", promo_reconcile::APP_NAME, promo_reconcile::VERSION);
    tracing::info!("==================================================");

    let month: u32 = args[4]
        .parse()
        .with_context(|| format!("月份无效: {}", args[4]))?;
    let year: i32 = args[5]
        .parse()
        .with_context(|| format!("年份无效: {}", args[5]))?;
    let target = TargetMonth::new(month, year)?;

    let manager = match args.get(6) {
        Some(path) => ConfigManager::from_path(path)
            .with_context(|| format!("配置加载失败: {}", path))?,
        None => ConfigManager::load_default().context("默认配置加载失败")?,
    };
    let config = manager.snapshot();

    let importer = PlanImporter::new(&config.overrides);
    let plan = importer
        .import_plan(args[0].as_str(), args[1].as_str(), args[2].as_str())
        .context("计划表导入失败")?;
    let snapshot = importer
        .import_external(&args[3])
        .context("外部系统导出导入失败")?;

    let result = ReconcileOrchestrator::new(config.clone())
        .run(plan.records, &snapshot, target)
        .context("对账失败")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
