//! Behavioural badges assigned by simple, configurable rules

use crate::api::{TraderPosition, TraderTrade};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Contrarian,
    LotteryTicket,
    Veteran,
    Novice,
    Whale,
    HighRoller,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Contrarian => "Contrarian",
            Self::LotteryTicket => "Lottery Ticket",
            Self::Veteran => "Veteran",
            Self::Novice => "Novice",
            Self::Whale => "Whale",
            Self::HighRoller => "High Roller",
        }
    }
}

/// Badge thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeRules {
    /// Share of entries below 0.5 needed for `Contrarian`
    pub contrarian_ratio: f64,
    /// A single position above this PnL is a lottery win
    pub lottery_pnl: f64,
    pub veteran_positions: usize,
    pub novice_positions: usize,
    pub whale_volume: f64,
    pub high_roller_volume: f64,
}

impl Default for BadgeRules {
    fn default() -> Self {
        Self {
            contrarian_ratio: 1.0,
            lottery_pnl: 100.0,
            veteran_positions: 500,
            novice_positions: 100,
            whale_volume: 500_000.0,
            high_roller_volume: 100_000.0,
        }
    }
}

/// Entry prices that are real probabilities, i.e. in (0, 1]
pub fn entry_prices(trades: &[TraderTrade]) -> Vec<f64> {
    trades
        .iter()
        .filter_map(|t| t.price)
        .filter(|p| *p > 0.0 && *p <= 1.0)
        .collect()
}

pub fn assign_badges(
    trades: &[TraderTrade],
    positions: &[TraderPosition],
    rules: &BadgeRules,
) -> Vec<Badge> {
    let mut badges = Vec::new();
    if trades.is_empty() {
        return badges;
    }

    let prices = entry_prices(trades);
    if !prices.is_empty() {
        let low_prob = prices.iter().filter(|p| **p < 0.5).count();
        let low_share = low_prob as f64 / prices.len() as f64;

        if low_share >= rules.contrarian_ratio {
            badges.push(Badge::Contrarian);
        }

        let lottery_wins = positions
            .iter()
            .filter(|p| p.cash_pnl.unwrap_or(0.0) > rules.lottery_pnl)
            .count();
        if lottery_wins > 0 && low_share > 0.5 {
            badges.push(Badge::LotteryTicket);
        }
    }

    if positions.len() >= rules.veteran_positions {
        badges.push(Badge::Veteran);
    } else if positions.len() >= rules.novice_positions {
        badges.push(Badge::Novice);
    }

    let volume: f64 = trades.iter().map(TraderTrade::notional).sum();
    if volume > rules.whale_volume {
        badges.push(Badge::Whale);
    } else if volume > rules.high_roller_volume {
        badges.push(Badge::HighRoller);
    }

    badges
}
