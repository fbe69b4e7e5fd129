//! # Planning
//!
//! 月度生產與物料計劃：出貨歷史 -> 需求預測 -> 產能與庫存約束的生產計劃 -> 分期 MRP，
//! 並以預測準確度回饋演算法選擇。
//!
//! ## 範例
//!
//! ```no_run
//! use planning::{PlanningConfig, PlanningInputs, PlanningPipeline};
//!
//! # fn main() -> planning::model::Result<()> {
//! let pipeline = PlanningPipeline::new(PlanningConfig::default())?;
//! let inputs = PlanningInputs::from_json_str(r#"{"shipments": []}"#)?;
//! let run = pipeline.run(&inputs);
//! println!("{}", run.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod pipeline;
pub mod telemetry;

pub use plan_accuracy as accuracy;
pub use plan_bom as bom;
pub use plan_core as model;
pub use plan_forecast as forecast;
pub use plan_mrp as mrp;
pub use plan_optimizer as optimizer;

// Re-export 主要類型
pub use pipeline::{ForecastAdjustment, PlanningInputs, PlanningPipeline, PlanningRun};
pub use plan_core::{PlanError, PlanningConfig};
