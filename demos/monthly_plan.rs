//! 月度計劃完整範例
//!
//! 兩個產品共用一條產線，展示預測、產能約束的生產計劃、MRP 與準確度回饋。
//!
//! 執行：`RUST_LOG=info cargo run --example monthly_plan`

use anyhow::Context;
use chrono::NaiveDate;
use plan_core::table::{BomRow, CapacityRow, InventoryRow, ShipmentRow, SupplierRow};
use plan_core::{
    Forecast, ForecastConfig, ForecastMethod, MrpPolicy, OvertimePolicy, Period, PlannerPolicy,
    PlanningConfig, PlanningMode, TargetInventory,
};
use planning::telemetry::init_tracing;
use planning::{PlanningInputs, PlanningPipeline};
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    init_tracing("info");

    println!("===== Monthly Production Plan Example =====\n");

    // 步驟 1: 計劃配置
    let generated_at = NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid timestamp")?;
    let config = PlanningConfig::new(generated_at)
        .with_forecast(ForecastConfig::default().with_horizon(6))
        .with_planner(
            PlannerPolicy::default()
                .with_mode(PlanningMode::MakeToForecast)
                .with_target_inventory(TargetInventory::RatioOfForecast(Decimal::new(1, 1)))
                .with_overtime(
                    OvertimePolicy::allowed(Decimal::from(15)).with_max_ratio(Decimal::new(2, 1)),
                )
                .with_default_resource("LINE-1"),
        )
        .with_mrp(MrpPolicy::default().with_production_lead_time(1));

    // 步驟 2: 輸入資料
    let inputs = build_inputs()?;
    println!("[1] Inputs");
    println!("    Shipments: {}", inputs.shipments.len());
    println!("    BOM edges: {}", inputs.bom.len());
    println!("    Prior forecasts: {}\n", inputs.prior_forecasts.len());

    // 步驟 3: 執行
    let pipeline = PlanningPipeline::new(config)?;
    let run = pipeline.run(&inputs);

    println!("[2] Forecast Selection");
    for selection in &run.selections {
        println!(
            "    {}: {} ({:?})",
            selection.product_id, selection.chosen, selection.reason
        );
    }

    println!("\n[3] Production Plan");
    for entry in &run.plan.entries {
        println!(
            "    {} {}: plan {:>8} forecast {:>8} ending {:>8} overtime {:>6}",
            entry.product_id,
            entry.period,
            entry.planned_qty,
            entry.forecast_qty,
            entry.ending_inventory,
            entry.overtime_qty
        );
    }
    println!("    Overtime cost: {}", run.plan.total_overtime_cost());

    if let Some(mrp) = &run.mrp {
        println!("\n[4] Planned Orders");
        for order in mrp.planned_orders() {
            println!(
                "    {:<8} {:?} {:>8} order in {} for {}{}",
                order.item_id,
                order.order_type,
                order.suggested_order_qty,
                order.suggested_order_period,
                order.period,
                if order.late { " (LATE)" } else { "" }
            );
        }
        println!("    Estimated purchase cost: {}", mrp.total_estimated_cost());
    }

    if let Some(report) = &run.accuracy {
        println!("\n[5] Forecast Accuracy");
        println!("    MAPE: {:?}", report.overall.mape);
        for finding in &report.bias {
            println!(
                "    {} {:?}: bias {} correction {:?}",
                finding.product_id, finding.direction, finding.mean_bias, finding.correction_factor
            );
        }
    }

    println!("\n[6] Exceptions: {}", run.exceptions.len());
    for exception in &run.exceptions {
        println!("    {}", exception);
    }
    for error in &run.errors {
        println!("    ERROR {} {:?}: {}", error.entity_id, error.kind, error.message);
    }

    Ok(())
}

fn build_inputs() -> anyhow::Result<PlanningInputs> {
    let start = Period::new(2024, 1)?;
    let bike: [i64; 12] = [80, 85, 90, 95, 100, 110, 120, 115, 105, 100, 95, 90];
    let scooter: [i64; 12] = [40, 42, 45, 43, 47, 50, 52, 51, 49, 48, 50, 53];

    let mut shipments = Vec::new();
    for (i, (b, s)) in bike.iter().zip(scooter.iter()).enumerate() {
        let period = start.add_months(i as i64).to_string();
        shipments.push(shipment("BIKE", &period, *b));
        shipments.push(shipment("SCOOTER", &period, *s));
    }

    let plan_start = Period::new(2025, 1)?;
    let capacity = Period::range(plan_start, 6)
        .into_iter()
        .map(|p| CapacityRow {
            resource_id: "LINE-1".to_string(),
            period: p.to_string(),
            max_units: Decimal::from(140),
        })
        .collect();

    let bom = vec![
        bom_row("BIKE", "FRAME", 1),
        bom_row("BIKE", "WHEEL", 2),
        bom_row("SCOOTER", "WHEEL", 2),
        bom_row("FRAME", "TUBE", 3),
    ];

    let inventory = vec![
        inventory_row("BIKE", 20),
        inventory_row("WHEEL", 60),
        inventory_row("TUBE", 100),
    ];

    let suppliers = vec![
        supplier_row("WHEEL", 1, 50, 10, "12.5"),
        supplier_row("TUBE", 2, 0, 25, "3.2"),
    ];

    // 去年下半年發布的預測，用來評分
    let prior_forecasts = (6..12)
        .map(|i| {
            Forecast::new(
                "BIKE",
                start.add_months(i),
                Decimal::from(100),
                ForecastMethod::moving_average(3),
                chrono::NaiveDateTime::default(),
            )
        })
        .collect();

    Ok(PlanningInputs {
        shipments,
        bom,
        inventory,
        suppliers,
        capacity,
        prior_forecasts,
        ..PlanningInputs::default()
    })
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

fn inventory_row(item: &str, qty: i64) -> InventoryRow {
    InventoryRow {
        item_id: item.to_string(),
        period: "2025-01".to_string(),
        on_hand_qty: Decimal::from(qty),
        incoming_qty: Decimal::ZERO,
        safety_stock_qty: Decimal::ZERO,
    }
}

fn supplier_row(component: &str, lead: u32, min: i64, multiple: i64, price: &str) -> SupplierRow {
    SupplierRow {
        component_id: component.to_string(),
        supplier_id: format!("SUP-{component}"),
        lead_time_periods: lead,
        min_order_qty: Decimal::from(min),
        lot_size_multiple: Decimal::from(multiple),
        unit_price: price.parse().ok(),
    }
}
