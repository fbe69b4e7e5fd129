//! 計劃配置模型
//!
//! 所有設定都以參數傳入各階段，沒有全域狀態。

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ForecastMethod, GapPolicy, PlanError, Result};

/// 預設預測期數（月）
pub const DEFAULT_FORECAST_HORIZON: usize = 12;

/// 自動選擇時保留作為驗證集的期數
pub const DEFAULT_HOLDOUT: usize = 3;

/// 主資料缺漏時的處理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingDataPolicy {
    /// 該實體計算失敗，列入錯誤
    Fail,
    /// 採用預設值並產生警告
    #[default]
    DefaultWithWarning,
}

/// 預測方法選擇
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MethodSelection {
    /// 固定使用指定方法
    Fixed(ForecastMethod),
    /// 以回測 MAPE 自動選擇
    #[default]
    Automatic,
}

/// 預測配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// 預測期數
    pub horizon: usize,

    /// 缺漏月份處理
    pub gap_policy: GapPolicy,

    /// 方法選擇
    pub selection: MethodSelection,

    /// 回測驗證期數
    pub holdout: usize,

    /// 自動選擇的候選方法（順序即平手時的次序）
    pub candidates: Vec<ForecastMethod>,

    /// 各產品偏好的方法（來自準確度分析），優先於自動選擇
    pub preferences: BTreeMap<String, ForecastMethod>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_FORECAST_HORIZON,
            gap_policy: GapPolicy::ZeroFill,
            selection: MethodSelection::Automatic,
            holdout: DEFAULT_HOLDOUT,
            candidates: ForecastMethod::default_candidates(),
            preferences: BTreeMap::new(),
        }
    }
}

impl ForecastConfig {
    /// 建構器模式：設置預測期數
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// 建構器模式：設置缺漏處理
    pub fn with_gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    /// 建構器模式：固定預測方法
    pub fn with_method(mut self, method: ForecastMethod) -> Self {
        self.selection = MethodSelection::Fixed(method);
        self
    }

    /// 建構器模式：設置回測期數
    pub fn with_holdout(mut self, holdout: usize) -> Self {
        self.holdout = holdout;
        self
    }

    /// 建構器模式：設置候選方法
    pub fn with_candidates(mut self, candidates: Vec<ForecastMethod>) -> Self {
        self.candidates = candidates;
        self
    }

    /// 建構器模式：設置產品偏好方法
    pub fn with_preferences(mut self, preferences: BTreeMap<String, ForecastMethod>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(PlanError::InvalidParameter("預測期數必須大於 0".to_string()));
        }
        if self.holdout == 0 {
            return Err(PlanError::InvalidParameter("回測期數必須大於 0".to_string()));
        }
        if let MethodSelection::Fixed(method) = &self.selection {
            method.validate()?;
        }
        if self.selection == MethodSelection::Automatic && self.candidates.is_empty() {
            return Err(PlanError::InvalidParameter("自動選擇需要至少一個候選方法".to_string()));
        }
        for method in self.candidates.iter().chain(self.preferences.values()) {
            method.validate()?;
        }
        Ok(())
    }
}

/// 生產計劃模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanningMode {
    /// 依預測生產（逐期追趕需求）
    #[default]
    MakeToForecast,
    /// 平準化生產（固定產率）
    Level,
}

/// 目標期末庫存
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetInventory {
    /// 固定數量
    Absolute(Decimal),
    /// 本期預測的比例
    RatioOfForecast(Decimal),
    /// 可支應天數（預測 × 天數 / 30）
    CoverageDays(u32),
}

impl Default for TargetInventory {
    fn default() -> Self {
        TargetInventory::Absolute(Decimal::ZERO)
    }
}

impl TargetInventory {
    /// 依本期預測計算目標期末庫存
    pub fn target_for(&self, forecast_qty: Decimal) -> Decimal {
        let target = match *self {
            TargetInventory::Absolute(qty) => qty,
            TargetInventory::RatioOfForecast(ratio) => forecast_qty * ratio,
            TargetInventory::CoverageDays(days) => {
                forecast_qty * Decimal::from(days) / Decimal::from(crate::plan::DAYS_PER_MONTH)
            }
        };
        target.max(Decimal::ZERO)
    }
}

/// 加班策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertimePolicy {
    /// 是否允許加班（超出產能）
    pub allowed: bool,

    /// 加班上限（產能的比例），None 表示不設上限
    pub max_ratio: Option<Decimal>,

    /// 每單位加班成本
    pub cost_per_unit: Decimal,
}

impl OvertimePolicy {
    /// 允許加班
    pub fn allowed(cost_per_unit: Decimal) -> Self {
        Self {
            allowed: true,
            max_ratio: None,
            cost_per_unit,
        }
    }

    /// 建構器模式：設置加班上限比例
    pub fn with_max_ratio(mut self, ratio: Decimal) -> Self {
        self.max_ratio = Some(ratio);
        self
    }

    /// 可使用的加班量；None 表示無上限
    pub fn allowance(&self, capacity: Decimal) -> Option<Decimal> {
        if !self.allowed {
            return Some(Decimal::ZERO);
        }
        self.max_ratio.map(|ratio| (capacity * ratio).max(Decimal::ZERO))
    }
}

/// 生產計劃策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerPolicy {
    /// 計劃模式
    pub mode: PlanningMode,

    /// 目標期末庫存
    pub target_inventory: TargetInventory,

    /// 加班策略
    pub overtime: OvertimePolicy,

    /// 最小生產批量（生產量向上取整到此倍數）
    pub min_batch_size: Option<Decimal>,

    /// 計劃期數，None 表示使用全部預測期
    pub horizon: Option<usize>,

    /// 產品 -> 資源 指派
    pub resource_assignments: BTreeMap<String, String>,

    /// 預設資源
    pub default_resource: Option<String>,

    /// 缺少產能資料時的處理
    pub missing_capacity: MissingDataPolicy,
}

impl Default for PlannerPolicy {
    fn default() -> Self {
        Self {
            mode: PlanningMode::MakeToForecast,
            target_inventory: TargetInventory::default(),
            overtime: OvertimePolicy::default(),
            min_batch_size: None,
            horizon: None,
            resource_assignments: BTreeMap::new(),
            default_resource: None,
            missing_capacity: MissingDataPolicy::DefaultWithWarning,
        }
    }
}

impl PlannerPolicy {
    /// 建構器模式：設置計劃模式
    pub fn with_mode(mut self, mode: PlanningMode) -> Self {
        self.mode = mode;
        self
    }

    /// 建構器模式：設置目標庫存
    pub fn with_target_inventory(mut self, target: TargetInventory) -> Self {
        self.target_inventory = target;
        self
    }

    /// 建構器模式：設置加班策略
    pub fn with_overtime(mut self, overtime: OvertimePolicy) -> Self {
        self.overtime = overtime;
        self
    }

    /// 建構器模式：設置最小批量
    pub fn with_min_batch_size(mut self, size: Decimal) -> Self {
        self.min_batch_size = Some(size);
        self
    }

    /// 建構器模式：設置計劃期數
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// 建構器模式：指派產品的資源
    pub fn with_resource(mut self, product_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_assignments
            .insert(product_id.into(), resource_id.into());
        self
    }

    /// 建構器模式：設置預設資源
    pub fn with_default_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.default_resource = Some(resource_id.into());
        self
    }

    /// 建構器模式：設置缺少產能資料的處理
    pub fn with_missing_capacity(mut self, policy: MissingDataPolicy) -> Self {
        self.missing_capacity = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.min_batch_size {
            if size <= Decimal::ZERO {
                return Err(PlanError::InvalidParameter(format!(
                    "最小生產批量必須大於 0，實際為 {size}"
                )));
            }
        }
        if let Some(ratio) = self.overtime.max_ratio {
            if ratio < Decimal::ZERO {
                return Err(PlanError::InvalidParameter(format!(
                    "加班上限比例不可為負，實際為 {ratio}"
                )));
            }
        }
        if self.overtime.cost_per_unit < Decimal::ZERO {
            return Err(PlanError::InvalidParameter("加班成本不可為負".to_string()));
        }
        match self.target_inventory {
            TargetInventory::Absolute(qty) | TargetInventory::RatioOfForecast(qty)
                if qty < Decimal::ZERO =>
            {
                Err(PlanError::InvalidParameter(format!("目標庫存不可為負，實際為 {qty}")))
            }
            _ => Ok(()),
        }
    }
}

/// MRP 策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MrpPolicy {
    /// 延遲訂單是否視為可加急（計入當期收料）
    pub expedite_late_orders: bool,

    /// 缺少供應商資料時的處理
    pub missing_supplier: MissingDataPolicy,

    /// 預設採購提前期（期數）
    pub default_lead_time_periods: u32,

    /// 預設最小訂購量
    pub default_min_order_qty: Decimal,

    /// 預設訂購倍數
    pub default_lot_size_multiple: Decimal,

    /// 自製半成品的生產提前期（期數）
    pub production_lead_time_periods: u32,
}

impl Default for MrpPolicy {
    fn default() -> Self {
        Self {
            expedite_late_orders: true,
            missing_supplier: MissingDataPolicy::DefaultWithWarning,
            default_lead_time_periods: 1,
            default_min_order_qty: Decimal::ZERO,
            default_lot_size_multiple: Decimal::ONE,
            production_lead_time_periods: 0,
        }
    }
}

impl MrpPolicy {
    /// 建構器模式：設置延遲訂單加急
    pub fn with_expedite_late_orders(mut self, expedite: bool) -> Self {
        self.expedite_late_orders = expedite;
        self
    }

    /// 建構器模式：設置缺少供應商資料的處理
    pub fn with_missing_supplier(mut self, policy: MissingDataPolicy) -> Self {
        self.missing_supplier = policy;
        self
    }

    /// 建構器模式：設置預設採購提前期
    pub fn with_default_lead_time(mut self, periods: u32) -> Self {
        self.default_lead_time_periods = periods;
        self
    }

    /// 建構器模式：設置自製提前期
    pub fn with_production_lead_time(mut self, periods: u32) -> Self {
        self.production_lead_time_periods = periods;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_min_order_qty < Decimal::ZERO {
            return Err(PlanError::InvalidParameter("預設最小訂購量不可為負".to_string()));
        }
        if self.default_lot_size_multiple < Decimal::ONE {
            return Err(PlanError::InvalidParameter(format!(
                "預設訂購倍數必須至少為 1，實際為 {}",
                self.default_lot_size_multiple
            )));
        }
        Ok(())
    }
}

/// 整體計劃配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// 執行時間戳（寫入預測，確保同樣輸入得到同樣輸出）
    pub generated_at: NaiveDateTime,

    pub forecast: ForecastConfig,
    pub planner: PlannerPolicy,
    pub mrp: MrpPolicy,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            generated_at: NaiveDateTime::default(),
            forecast: ForecastConfig::default(),
            planner: PlannerPolicy::default(),
            mrp: MrpPolicy::default(),
        }
    }
}

impl PlanningConfig {
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            generated_at,
            ..Self::default()
        }
    }

    /// 建構器模式：設置預測配置
    pub fn with_forecast(mut self, forecast: ForecastConfig) -> Self {
        self.forecast = forecast;
        self
    }

    /// 建構器模式：設置生產計劃策略
    pub fn with_planner(mut self, planner: PlannerPolicy) -> Self {
        self.planner = planner;
        self
    }

    /// 建構器模式：設置 MRP 策略
    pub fn with_mrp(mut self, mrp: MrpPolicy) -> Self {
        self.mrp = mrp;
        self
    }

    /// 從 JSON 載入（未提供的欄位使用預設值）
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlanningConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.forecast.validate()?;
        self.planner.validate()?;
        self.mrp.validate()
    }
}
