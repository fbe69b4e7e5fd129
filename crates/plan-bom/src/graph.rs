//! BOM 有向無環圖

use plan_core::{BomEdge, PlanError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ItemClass;

/// BOM 圖
///
/// 建構時即檢查循環；成功建構的圖保證無環，拓撲順序與低階碼在建構時算好。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomGraph {
    /// parent -> (child -> 單位用量)
    children: BTreeMap<String, BTreeMap<String, Decimal>>,

    /// child -> parents
    parents: BTreeMap<String, BTreeSet<String>>,

    /// 拓撲順序（上階在前）
    order: Vec<String>,

    /// 低階碼：物料在所有路徑中的最深層級
    low_level_codes: BTreeMap<String, u32>,
}

impl BomGraph {
    /// 由 BOM 邊建立圖
    ///
    /// 相同 (parent, child) 的邊用量累加。存在循環時回傳 `CyclicBom`，並附上一條具體的循環路徑。
    pub fn from_edges(edges: impl IntoIterator<Item = BomEdge>) -> Result<Self> {
        let mut children: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
        let mut parents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut items: BTreeSet<String> = BTreeSet::new();
        let mut edge_count = 0usize;

        for edge in edges {
            // 欄位是公開的，這裡再檢查一次
            let edge = BomEdge::new(edge.parent_id, edge.child_id, edge.quantity_per_unit)?;

            items.insert(edge.parent_id.clone());
            items.insert(edge.child_id.clone());
            parents
                .entry(edge.child_id.clone())
                .or_default()
                .insert(edge.parent_id.clone());
            *children
                .entry(edge.parent_id)
                .or_default()
                .entry(edge.child_id)
                .or_insert(Decimal::ZERO) += edge.quantity_per_unit;
            edge_count += 1;
        }

        let order = topological_sort(&items, &children, &parents)?;
        let low_level_codes = compute_low_level_codes(&order, &children);

        tracing::debug!(
            "BOM 圖建立完成: {} 個物料, {} 條邊, 最大層級 {}",
            items.len(),
            edge_count,
            low_level_codes.values().max().copied().unwrap_or(0)
        );

        Ok(Self {
            children,
            parents,
            order,
            low_level_codes,
        })
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.low_level_codes.contains_key(item_id)
    }

    /// 所有物料（依ID排序）
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.low_level_codes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.low_level_codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low_level_codes.is_empty()
    }

    /// 直接子件與單位用量
    pub fn children(&self, item_id: &str) -> Vec<(&str, Decimal)> {
        self.children
            .get(item_id)
            .map(|c| c.iter().map(|(id, qty)| (id.as_str(), *qty)).collect())
            .unwrap_or_default()
    }

    /// 直接上階（使用此物料的物料）
    pub fn parents(&self, item_id: &str) -> Vec<&str> {
        self.parents
            .get(item_id)
            .map(|p| p.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_children(&self, item_id: &str) -> bool {
        self.children.contains_key(item_id)
    }

    /// 單位用量（沒有直接關係時為 None）
    pub fn quantity_per_unit(&self, parent_id: &str, child_id: &str) -> Option<Decimal> {
        self.children
            .get(parent_id)
            .and_then(|c| c.get(child_id))
            .copied()
    }

    /// 拓撲順序（上階一定排在子件之前）
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn low_level_code(&self, item_id: &str) -> Option<u32> {
        self.low_level_codes.get(item_id).copied()
    }

    pub fn low_level_codes(&self) -> &BTreeMap<String, u32> {
        &self.low_level_codes
    }

    /// 依低階碼分組的物料；同一層的物料互不相依
    pub fn levels(&self) -> Vec<Vec<&str>> {
        let max_level = self.low_level_codes.values().max().copied();
        let mut levels: Vec<Vec<&str>> = match max_level {
            Some(max) => vec![Vec::new(); max as usize + 1],
            None => Vec::new(),
        };
        for (item, level) in &self.low_level_codes {
            levels[*level as usize].push(item.as_str());
        }
        levels
    }

    /// 依度數推斷物料類別
    pub fn item_class(&self, item_id: &str) -> ItemClass {
        let has_parents = self.parents.contains_key(item_id);
        let has_children = self.children.contains_key(item_id);
        match (has_parents, has_children) {
            (false, true) => ItemClass::FinishedGood,
            (true, true) => ItemClass::SemiFinished,
            (true, false) => ItemClass::RawMaterial,
            (false, false) => ItemClass::Standalone,
        }
    }
}

/// Kahn 演算法；就緒佇列依ID排序，輸出是確定的
fn topological_sort(
    items: &BTreeSet<String>,
    children: &BTreeMap<String, BTreeMap<String, Decimal>>,
    parents: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = items
        .iter()
        .map(|item| (item.as_str(), parents.get(item).map_or(0, BTreeSet::len)))
        .collect();

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(item, _)| *item)
        .collect();

    let mut order = Vec::with_capacity(items.len());

    while let Some(item) = ready.pop_first() {
        order.push(item.to_string());
        if let Some(item_children) = children.get(item) {
            for child in item_children.keys() {
                if let Some(degree) = in_degree.get_mut(child.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(child.as_str());
                    }
                }
            }
        }
    }

    if order.len() < items.len() {
        let remaining: BTreeSet<&str> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(item, _)| item)
            .collect();
        let path = find_cycle(&remaining, parents);
        tracing::warn!("BOM 存在循環: {}", path.join(" -> "));
        return Err(PlanError::CyclicBom { path });
    }

    Ok(order)
}

/// 在 Kahn 演算法剩下的節點中找出一條循環
///
/// 剩下的節點都還有剩下的上階，因此沿上階走必然回到走過的節點。
fn find_cycle(remaining: &BTreeSet<&str>, parents: &BTreeMap<String, BTreeSet<String>>) -> Vec<String> {
    let Some(start) = remaining.first() else {
        return Vec::new();
    };

    let mut walk: Vec<&str> = vec![start];
    let mut position: BTreeMap<&str, usize> = BTreeMap::new();
    position.insert(start, 0);

    loop {
        let current = walk[walk.len() - 1];
        let next = parents
            .get(current)
            .and_then(|p| p.iter().map(String::as_str).find(|p| remaining.contains(p)));

        let Some(next) = next else {
            return walk.iter().rev().map(|s| s.to_string()).collect();
        };

        if let Some(&first) = position.get(next) {
            // walk[first..] 是子件 -> 上階方向，反轉成上階 -> 子件
            let mut path: Vec<String> = walk[first..].iter().rev().map(|s| s.to_string()).collect();
            path.insert(0, next.to_string());
            return path;
        }

        position.insert(next, walk.len());
        walk.push(next);
    }
}

/// 依拓撲順序計算低階碼：子件層級 = 所有上階層級的最大值 + 1
fn compute_low_level_codes(
    order: &[String],
    children: &BTreeMap<String, BTreeMap<String, Decimal>>,
) -> BTreeMap<String, u32> {
    let mut codes: BTreeMap<String, u32> = order.iter().map(|item| (item.clone(), 0)).collect();

    for item in order {
        let level = codes.get(item).copied().unwrap_or(0);
        if let Some(item_children) = children.get(item) {
            for child in item_children.keys() {
                if let Some(code) = codes.get_mut(child) {
                    *code = (*code).max(level + 1);
                }
            }
        }
    }

    codes
}
