//! 時間索引多項式迴歸（最小平方法）

use crate::{mean, residual_std, Estimate, Estimator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolynomialRegression {
    pub degree: usize,
}

/// 多項式係數（由常數項開始）
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn value_at(&self, t: usize) -> f64 {
        let x = t as f64;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

/// 以正規方程式擬合 y = c0 + c1·t + ... + cd·t^d
///
/// 方程式奇異時退回常數（平均值）。
pub fn fit_polynomial(values: &[f64], degree: usize) -> Polynomial {
    let size = degree + 1;
    let mut matrix = vec![vec![0.0; size + 1]; size];

    for (t, y) in values.iter().enumerate() {
        let x = t as f64;
        let powers: Vec<f64> = (0..=2 * degree).map(|p| x.powi(p as i32)).collect();
        for row in 0..size {
            for col in 0..size {
                matrix[row][col] += powers[row + col];
            }
            matrix[row][size] += powers[row] * y;
        }
    }

    match solve(matrix) {
        Some(coefficients) => Polynomial { coefficients },
        None => Polynomial {
            coefficients: vec![mean(values)],
        },
    }
}

/// 高斯消去法（部分選主元），矩陣為增廣矩陣
fn solve(mut matrix: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let size = matrix.len();

    for col in 0..size {
        let pivot = (col..size).max_by(|a, b| {
            matrix[*a][col]
                .abs()
                .total_cmp(&matrix[*b][col].abs())
        })?;
        if matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);

        for row in col + 1..size {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=size {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    let mut solution = vec![0.0; size];
    for row in (0..size).rev() {
        let tail: f64 = (row + 1..size).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (matrix[row][size] - tail) / matrix[row][row];
    }

    solution.iter().all(|c| c.is_finite()).then_some(solution)
}

impl Estimator for PolynomialRegression {
    fn fit_predict(&self, history: &[f64], horizon: usize) -> Estimate {
        let polynomial = fit_polynomial(history, self.degree);
        let n = history.len();

        let residuals: Vec<f64> = history
            .iter()
            .enumerate()
            .map(|(t, y)| y - polynomial.value_at(t))
            .collect();

        Estimate {
            points: (n..n + horizon).map(|t| polynomial.value_at(t)).collect(),
            residual_std: residual_std(&residuals, self.degree + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_linear_fit_is_exact() {
        let history: Vec<f64> = (0..6).map(|t| 10.0 + 5.0 * t as f64).collect();
        let estimate = PolynomialRegression { degree: 1 }.fit_predict(&history, 2);
        assert!((estimate.points[0] - 40.0).abs() < 1e-9);
        assert!((estimate.points[1] - 45.0).abs() < 1e-9);
        assert!(estimate.residual_std < 1e-9);
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    fn test_recovers_quadratic(#[case] degree: usize) {
        let history: Vec<f64> = (0..8).map(|t| 3.0 + 0.5 * (t * t) as f64).collect();
        let estimate = PolynomialRegression { degree }.fit_predict(&history, 1);
        assert!((estimate.points[0] - (3.0 + 0.5 * 64.0)).abs() < 1e-6);
    }

    #[test]
    fn test_declining_trend_goes_negative() {
        // 引擎負責截斷，演算法本身回傳原始估計
        let history = [30.0, 20.0, 10.0];
        let estimate = PolynomialRegression { degree: 1 }.fit_predict(&history, 2);
        assert!((estimate.points[0] - 0.0).abs() < 1e-9);
        assert!((estimate.points[1] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_system_falls_back_to_mean() {
        // 只有一個點無法決定斜率
        let polynomial = fit_polynomial(&[42.0], 1);
        assert_eq!(polynomial.coefficients, vec![42.0]);
    }
}
