use thiserror::Error;

/// 重叠计算各阶段可区分的错误类别。
///
/// 库函数统一返回 `anyhow::Result`，需要区分类别时用 `downcast_ref::<OverlapError>()`。
#[derive(Debug, Error)]
pub enum OverlapError {
    /// 参数在开始任何计算之前就不合法
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 索引文件损坏，或与请求的参数 / 另一半索引不一致
    #[error("index consistency error: {0}")]
    Index(String),

    /// 调用方违反算法前提（例如 exact 不可约模式下存在子串读段）
    #[error("algorithm precondition violated: {0}")]
    Precondition(String),

    /// 近似搜索请求的差异数超过误差率对该查询允许的上限
    #[error("search budget of {budget} differences exceeds the {allowed} allowed by the error rate")]
    SearchBudget { budget: usize, allowed: usize },

    /// 命中文件中的一行无法解析，或引用了不存在的行 / 读段
    #[error("malformed hit record: {0}")]
    HitFormat(String),
}

impl OverlapError {
    pub fn config(msg: impl Into<String>) -> Self {
        OverlapError::Config(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        OverlapError::Index(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_budget_message_names_both_limits() {
        let msg = OverlapError::SearchBudget { budget: 3, allowed: 1 }.to_string();
        assert_eq!(msg, "search budget of 3 differences exceeds the 1 allowed by the error rate");
    }
}
