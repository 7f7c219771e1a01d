use common::types::WalletPnl;

/// Standing bucket derived from lifetime PnL. Thresholds are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Elite,
    Profitable,
    NeedsGrowth,
}

impl Standing {
    pub fn from_pnl(pnl_usd: f64) -> Self {
        if pnl_usd > 1000.0 {
            Self::Elite
        } else if pnl_usd > 0.0 {
            Self::Profitable
        } else {
            Self::NeedsGrowth
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elite => "ELITE",
            Self::Profitable => "PROFITABLE",
            Self::NeedsGrowth => "NEEDS GROWTH",
        }
    }
}

impl std::fmt::Display for Standing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of auditing one wallet.
#[derive(Debug, Clone, Copy)]
pub struct AuditReport {
    pub pnl_usd: f64,
    pub score: f64,
    pub standing: Standing,
}

impl AuditReport {
    /// A wallet the analytics feed knows nothing about audits as neutral,
    /// not as an error.
    pub fn from_pnl(pnl: Option<WalletPnl>) -> Self {
        let pnl_usd = pnl.map_or(0.0, |p| p.total_usd);
        Self {
            pnl_usd,
            score: zer_score(pnl_usd),
            standing: Standing::from_pnl(pnl_usd),
        }
    }

    /// Reply body for a mention audit. Kept under the cast length limit.
    pub fn reply_text(&self, author: &str) -> String {
        format!(
            "@{author} Identity resolved.\nZer Score: {:.1}/100\nLifetime PnL: ${:.2}\nStanding: {}",
            self.score, self.pnl_usd, self.standing
        )
    }
}

/// Reputation score on a 0..=100 scale, centered at 50 for zero PnL.
/// Log-compressed so a 10x PnL difference moves the score by a constant
/// 10 points, in either direction.
pub fn zer_score(pnl_usd: f64) -> f64 {
    let magnitude = (pnl_usd.abs() + 1.0).log10() * 10.0;
    let raw = if pnl_usd >= 0.0 {
        50.0 + magnitude
    } else {
        50.0 - magnitude
    };
    raw.clamp(0.0, 100.0)
}
