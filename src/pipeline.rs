//! 端到端計劃流程
//!
//! 出貨資料 -> 準確度分析 -> 預測 -> 生產計劃 -> MRP。
//! 單一產品或物料失敗不會中止整批；BOM 有循環時只略過 MRP。

use plan_accuracy::AccuracyReport;
use plan_bom::BomGraph;
use plan_core::table::{
    convert_rows, BomRow, CapacityRow, InventoryRow, ShipmentRow, SupplierRow,
};
use plan_core::{
    BomEdge, CapacityRecord, CapacityTable, EntityError, Forecast, ForecastConfig, ForecastLedger,
    InventoryRecord, InventoryTable, ManualOverride, Period, PlanningConfig, PlanningException,
    Result, SupplierRecord, SupplierTable, TimeSeriesPoint, TimeSeriesStore, Warning,
};
use plan_forecast::{ForecastEngine, SelectionReport};
use plan_mrp::{MrpCalculator, MrpResult};
use plan_optimizer::{ProductionPlan, ProductionPlanner};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// BOM 階段錯誤的實體ID
pub const BOM_ENTITY: &str = "BOM";

/// 生產計劃階段錯誤的實體ID
pub const PLAN_ENTITY: &str = "production-plan";

/// MRP 階段錯誤的實體ID
pub const MRP_ENTITY: &str = "mrp";

/// 人工調整預測
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAdjustment {
    pub product_id: String,
    pub period: Period,
    pub quantity: Decimal,
}

impl ForecastAdjustment {
    pub fn new(product_id: impl Into<String>, period: Period, quantity: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            period,
            quantity,
        }
    }
}

/// 計劃輸入（外部資料列格式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningInputs {
    pub shipments: Vec<ShipmentRow>,
    pub bom: Vec<BomRow>,
    pub inventory: Vec<InventoryRow>,
    pub suppliers: Vec<SupplierRow>,
    pub capacity: Vec<CapacityRow>,

    /// 人工指定的生產量
    pub overrides: Vec<ManualOverride>,

    /// 人工調整預測
    pub adjustments: Vec<ForecastAdjustment>,

    /// 先前發布的預測，用實際出貨評分
    pub prior_forecasts: Vec<Forecast>,
}

impl PlanningInputs {
    /// 從 JSON 載入
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 一次計劃執行的完整結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningRun {
    /// 各 (產品, 期間) 的最新預測
    pub forecasts: Vec<Forecast>,

    /// 本次產生的所有預測版本（含人工調整）
    pub ledger: ForecastLedger,

    /// 各產品的方法選擇
    pub selections: Vec<SelectionReport>,

    pub plan: ProductionPlan,

    /// BOM 無效或計算失敗時為 None
    pub mrp: Option<MrpResult>,

    /// 沒有先前預測時為 None
    pub accuracy: Option<AccuracyReport>,

    /// 所有階段的計劃例外
    pub exceptions: Vec<PlanningException>,

    pub warnings: Vec<Warning>,

    /// 失敗的資料列、產品、物料或階段
    pub errors: Vec<EntityError>,
}

impl PlanningRun {
    /// 沒有任何失敗
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.mrp.is_some()
    }

    /// 某實體的計劃例外
    pub fn exceptions_for<'a>(
        &'a self,
        entity_id: &'a str,
    ) -> impl Iterator<Item = &'a PlanningException> + 'a {
        self.exceptions
            .iter()
            .filter(move |e| e.entity_id() == entity_id)
    }

    /// 匯出為 JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 計劃流程
#[derive(Debug, Clone)]
pub struct PlanningPipeline {
    config: PlanningConfig,
}

impl PlanningPipeline {
    /// 創建流程（驗證配置）
    pub fn new(config: PlanningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    /// 執行完整流程
    pub fn run(&self, inputs: &PlanningInputs) -> PlanningRun {
        info!(
            "開始計劃流程：出貨 {} 筆，BOM {} 筆，庫存 {} 筆，供應商 {} 筆，產能 {} 筆",
            inputs.shipments.len(),
            inputs.bom.len(),
            inputs.inventory.len(),
            inputs.suppliers.len(),
            inputs.capacity.len()
        );

        let mut run = PlanningRun::default();

        // Step 1: 資料列轉換
        let store = self.load_shipments(inputs, &mut run.errors);
        let inventory = InventoryTable::from_records(collect_rows::<_, InventoryRecord>(
            &inputs.inventory,
            &mut run.errors,
        ));
        let capacity = CapacityTable::from_records(collect_rows::<_, CapacityRecord>(
            &inputs.capacity,
            &mut run.errors,
        ));
        let suppliers = SupplierTable::from_records(collect_rows::<_, SupplierRecord>(
            &inputs.suppliers,
            &mut run.errors,
        ));
        let edges = collect_rows::<_, BomEdge>(&inputs.bom, &mut run.errors);

        // Step 2: 準確度分析（先前預測 vs 實際出貨）
        if !inputs.prior_forecasts.is_empty() {
            run.accuracy = Some(AccuracyReport::analyze(&inputs.prior_forecasts, &store));
        }

        // Step 3: 預測
        let forecast_config = self.forecast_config(run.accuracy.as_ref());
        let engine = ForecastEngine::new(forecast_config, self.config.generated_at);
        let batch = engine.forecast_all(&store);
        let mut ledger = batch.to_ledger();
        for adjustment in &inputs.adjustments {
            if let Err(err) = ledger.adjust(
                &adjustment.product_id,
                adjustment.period,
                adjustment.quantity,
                self.config.generated_at,
            ) {
                warn!("預測調整失敗 {}: {}", adjustment.product_id, err);
                run.errors.push(EntityError::new(&adjustment.product_id, &err));
            }
        }
        run.forecasts = ledger.latest_forecasts();
        run.ledger = ledger;
        run.selections = batch.selections;
        run.exceptions.extend(batch.exceptions);
        run.warnings.extend(batch.warnings);
        run.errors.extend(batch.errors);

        // Step 4: 生產計劃
        let mut planner_policy = self.config.planner.clone();
        let forecast_horizon = self.config.forecast.horizon;
        planner_policy.horizon = Some(
            planner_policy
                .horizon
                .map_or(forecast_horizon, |h| h.min(forecast_horizon)),
        );

        match ProductionPlanner::plan(
            &run.forecasts,
            &inventory,
            &capacity,
            &inputs.overrides,
            &planner_policy,
        ) {
            Ok(plan) => run.plan = plan,
            Err(err) => {
                warn!("生產計劃失敗: {}", err);
                run.errors.push(EntityError::new(PLAN_ENTITY, &err));
            }
        }
        run.exceptions.extend(run.plan.exceptions.iter().cloned());
        run.warnings.extend(run.plan.warnings.iter().cloned());
        run.errors.extend(run.plan.errors.iter().cloned());

        // Step 5: MRP（BOM 有循環時略過）
        match BomGraph::from_edges(edges) {
            Ok(bom) => {
                let calculator =
                    MrpCalculator::new(&bom, &inventory, &suppliers, &self.config.mrp);
                match calculator.calculate(&run.plan.entries) {
                    Ok(mrp) => {
                        run.exceptions.extend(mrp.exceptions.iter().cloned());
                        run.warnings.extend(mrp.warnings.iter().cloned());
                        run.errors.extend(mrp.errors.iter().cloned());
                        run.mrp = Some(mrp);
                    }
                    Err(err) => {
                        warn!("MRP 計算失敗: {}", err);
                        run.errors.push(EntityError::new(MRP_ENTITY, &err));
                    }
                }
            }
            Err(err) => {
                warn!("BOM 無效，略過 MRP: {}", err);
                run.errors.push(EntityError::new(BOM_ENTITY, &err));
            }
        }

        info!(
            "計劃流程完成：預測 {} 筆，生產計劃 {} 筆，MRP {} 筆，例外 {} 筆，錯誤 {} 筆",
            run.forecasts.len(),
            run.plan.entries.len(),
            run.mrp.as_ref().map_or(0, |m| m.requirements.len()),
            run.exceptions.len(),
            run.errors.len()
        );
        run
    }

    fn load_shipments(&self, inputs: &PlanningInputs, errors: &mut Vec<EntityError>) -> TimeSeriesStore {
        let points = collect_rows::<_, TimeSeriesPoint>(&inputs.shipments, errors);
        let mut store = TimeSeriesStore::new();
        for point in points {
            let product_id = point.product_id.clone();
            if let Err(err) = store.insert(point) {
                warn!("出貨資料無法加入 {}: {}", product_id, err);
                errors.push(EntityError::new(product_id, &err));
            }
        }
        store
    }

    /// 準確度分析的偏好方法補入預測配置；配置中已指定的產品不覆寫
    fn forecast_config(&self, accuracy: Option<&AccuracyReport>) -> ForecastConfig {
        let mut config = self.config.forecast.clone();
        if let Some(report) = accuracy {
            let mut preferences = report.preferred_methods();
            preferences.extend(config.preferences.clone());
            config = config.with_preferences(preferences);
        }
        config
    }
}

fn collect_rows<R, T>(rows: &[R], errors: &mut Vec<EntityError>) -> Vec<T>
where
    R: Clone + plan_core::table::RowIdentity,
    T: TryFrom<R, Error = plan_core::PlanError>,
{
    let (records, row_errors) = convert_rows(rows.iter().cloned());
    errors.extend(row_errors);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use plan_core::{ErrorKind, ForecastMethod, ForecastSource, MethodSelection};

    fn config() -> PlanningConfig {
        let generated_at = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        PlanningConfig::new(generated_at).with_forecast(
            ForecastConfig::default()
                .with_horizon(3)
                .with_method(ForecastMethod::moving_average(3)),
        )
    }

    fn shipment(product: &str, period: &str, qty: i64) -> ShipmentRow {
        ShipmentRow {
            product_id: product.to_string(),
            period: period.to_string(),
            quantity: Decimal::from(qty),
        }
    }

    fn bom_row(parent: &str, child: &str, qty: i64) -> BomRow {
        BomRow {
            parent_product_id: parent.to_string(),
            child_component_id: child.to_string(),
            quantity_per_unit: Decimal::from(qty),
        }
    }

    fn inputs() -> PlanningInputs {
        PlanningInputs {
            shipments: ["2025-04", "2025-05", "2025-06"]
                .iter()
                .map(|p| shipment("BIKE", p, 100))
                .collect(),
            bom: vec![bom_row("BIKE", "C", 2)],
            suppliers: vec![SupplierRow {
                component_id: "C".to_string(),
                supplier_id: "SUP-1".to_string(),
                lead_time_periods: 1,
                min_order_qty: Decimal::ZERO,
                lot_size_multiple: Decimal::ONE,
                unit_price: None,
            }],
            ..PlanningInputs::default()
        }
    }

    #[test]
    fn test_run_produces_all_stages() {
        let pipeline = PlanningPipeline::new(config()).unwrap();
        let run = pipeline.run(&inputs());

        assert_eq!(run.forecasts.len(), 3);
        assert_eq!(run.plan.entries.len(), 3);
        let mrp = run.mrp.as_ref().unwrap();
        assert_eq!(mrp.requirements_for("C").count(), 3);
        assert!(run.accuracy.is_none());
        assert!(run.errors.is_empty());
        assert!(run.is_complete());
    }

    #[test]
    fn test_invalid_rows_reported_not_fatal() {
        let mut data = inputs();
        data.shipments.push(shipment("BIKE", "2025-13", 10));
        data.shipments.push(shipment("TRIKE", "2025-06", -5));

        let run = PlanningPipeline::new(config()).unwrap().run(&data);

        assert_eq!(run.errors.len(), 2);
        assert!(run.errors.iter().any(|e| e.entity_id == "TRIKE"));
        assert_eq!(run.plan.entries.len(), 3);
    }

    #[test]
    fn test_cyclic_bom_skips_mrp_only() {
        let mut data = inputs();
        data.bom.push(bom_row("C", "BIKE", 1));

        let run = PlanningPipeline::new(config()).unwrap().run(&data);

        assert!(run.mrp.is_none());
        assert_eq!(run.plan.entries.len(), 3);
        assert_eq!(run.errors.len(), 1);
        assert_eq!(run.errors[0].entity_id, BOM_ENTITY);
        assert_eq!(run.errors[0].kind, ErrorKind::CyclicBom);
    }

    #[test]
    fn test_adjustment_supersedes_forecast() {
        let mut data = inputs();
        let period = Period::new(2025, 7).unwrap();
        data.adjustments
            .push(ForecastAdjustment::new("BIKE", period, Decimal::from(150)));

        let run = PlanningPipeline::new(config()).unwrap().run(&data);

        let july = run.forecasts.iter().find(|f| f.period == period).unwrap();
        assert_eq!(july.predicted_quantity, Decimal::from(150));
        assert_eq!(july.source, ForecastSource::ManualAdjustment);
        assert_eq!(run.ledger.versions("BIKE", period).len(), 2);
        assert_eq!(run.plan.entry("BIKE", period).unwrap().planned_qty, Decimal::from(150));
    }

    #[test]
    fn test_accuracy_preferences_feed_forecasting() {
        let mut config = config();
        config.forecast.selection = MethodSelection::Automatic;
        let generated_at = config.generated_at;

        let mut data = inputs();
        data.prior_forecasts = vec![Forecast::new(
            "BIKE",
            Period::new(2025, 6).unwrap(),
            Decimal::from(100),
            ForecastMethod::regression(1),
            generated_at,
        )];

        let run = PlanningPipeline::new(config).unwrap().run(&data);

        let report = run.accuracy.as_ref().unwrap();
        assert_eq!(report.overall.mape, Some(Decimal::ZERO));
        assert!(run
            .forecasts
            .iter()
            .all(|f| f.method == ForecastMethod::regression(1)));
    }

    #[test]
    fn test_fixed_method_ignores_accuracy_preference() {
        let mut data = inputs();
        data.prior_forecasts = vec![Forecast::new(
            "BIKE",
            Period::new(2025, 6).unwrap(),
            Decimal::from(100),
            ForecastMethod::regression(1),
            config().generated_at,
        )];

        let run = PlanningPipeline::new(config()).unwrap().run(&data);

        assert!(run.accuracy.is_some());
        assert!(run
            .forecasts
            .iter()
            .all(|f| f.method == ForecastMethod::moving_average(3)));
    }

    #[test]
    fn test_products_with_different_history_ends() {
        let mut shipments: Vec<ShipmentRow> = Period::range(Period::new(2025, 1).unwrap(), 6)
            .into_iter()
            .map(|p| shipment("A", &p.to_string(), 100))
            .collect();
        shipments.extend(
            Period::range(Period::new(2024, 10).unwrap(), 6)
                .into_iter()
                .map(|p| shipment("B", &p.to_string(), 40)),
        );
        let data = PlanningInputs {
            shipments,
            ..PlanningInputs::default()
        };

        let run = PlanningPipeline::new(config()).unwrap().run(&data);

        let months = |product: &str| -> Vec<String> {
            run.plan
                .entries_for(product)
                .map(|e| e.period.to_string())
                .collect()
        };
        assert_eq!(months("A"), vec!["2025-07", "2025-08", "2025-09"]);
        assert_eq!(months("B"), vec!["2025-04", "2025-05", "2025-06"]);

        let total_a: Decimal = run.plan.entries_for("A").map(|e| e.planned_qty).sum();
        assert_eq!(total_a, Decimal::from(300));
        assert!(run
            .plan
            .entries_for("A")
            .all(|e| e.forecast_qty == Decimal::from(100)));
        let total_b: Decimal = run.plan.entries_for("B").map(|e| e.planned_qty).sum();
        assert_eq!(total_b, Decimal::from(120));
    }

    #[test]
    fn test_plan_horizon_capped_by_forecast_horizon() {
        let mut config = config();
        config.planner = config.planner.clone().with_horizon(12);
        let run = PlanningPipeline::new(config).unwrap().run(&inputs());
        assert_eq!(run.plan.horizon().len(), 3);
    }
}
