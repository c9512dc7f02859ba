//! Standard-mode ratio arithmetic.
//!
//! Standard mode draws 50% Recall, 30% Comprehension and 20% Application
//! (Application and HighApplication combined). The largest exam the pool
//! supports is set by the bottleneck category:
//!
//! max = floor(min(c_recall / 0.5, c_comprehension / 0.3, c_application / 0.2))
//!
//! Percentages are kept as integers so the floor and the half-up rounding of
//! quotas are exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ComposeError;
use crate::model::{Category, ClampNotice, Difficulty, QuestionRecord};

/// Category shares in percent. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub recall: usize,
    pub comprehension: usize,
    pub application: usize,
}

/// The fixed 50/30/20 standard-mode ratio.
pub const STANDARD_RATIO: Ratio = Ratio {
    recall: 50,
    comprehension: 30,
    application: 20,
};

impl Ratio {
    /// Largest total whose every share fits in the available counts.
    ///
    /// Zero when any category with a positive share is empty.
    pub fn max_feasible(&self, counts: &CategoryCounts) -> usize {
        [
            (counts.recall, self.recall),
            (counts.comprehension, self.comprehension),
            (counts.application, self.application),
        ]
        .into_iter()
        .filter(|&(_, pct)| pct > 0)
        .map(|(available, pct)| available * 100 / pct)
        .min()
        .unwrap_or(0)
    }

    /// Per-category quotas for `total`.
    ///
    /// Recall and Comprehension are rounded half-up; Application takes the
    /// remainder so the three always sum to `total`.
    pub fn quotas(&self, total: usize) -> Quotas {
        let recall = round_half_up(total * self.recall, 100);
        let comprehension = round_half_up(total * self.comprehension, 100);
        let application = total.saturating_sub(recall + comprehension);
        Quotas {
            recall,
            comprehension,
            application,
        }
    }
}

fn round_half_up(numerator: usize, denominator: usize) -> usize {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Number of available questions per ratio category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub recall: usize,
    pub comprehension: usize,
    /// Application and HighApplication combined.
    pub application: usize,
}

impl CategoryCounts {
    pub fn new(recall: usize, comprehension: usize, application: usize) -> Self {
        Self {
            recall,
            comprehension,
            application,
        }
    }

    /// Count a pool's questions by category.
    pub fn from_pool<'a, I>(pool: I) -> Self
    where
        I: IntoIterator<Item = &'a QuestionRecord>,
    {
        let mut counts = Self::default();
        for question in pool {
            match question.difficulty.category() {
                Category::Recall => counts.recall += 1,
                Category::Comprehension => counts.comprehension += 1,
                Category::Application => counts.application += 1,
            }
        }
        counts
    }

    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Recall => self.recall,
            Category::Comprehension => self.comprehension,
            Category::Application => self.application,
        }
    }

    pub fn total(&self) -> usize {
        self.recall + self.comprehension + self.application
    }
}

impl fmt::Display for CategoryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recall {}, comprehension {}, application {}",
            self.recall, self.comprehension, self.application
        )
    }
}

/// Questions to draw from each category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    pub recall: usize,
    pub comprehension: usize,
    pub application: usize,
}

impl Quotas {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Recall => self.recall,
            Category::Comprehension => self.comprehension,
            Category::Application => self.application,
        }
    }

    pub fn total(&self) -> usize {
        self.recall + self.comprehension + self.application
    }
}

/// Outcome of a standard-mode distribution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Largest total the pool supports under the ratio.
    pub max_feasible: usize,
    /// Total the caller asked for.
    pub requested: usize,
    /// Quotas for `min(requested, max_feasible)`.
    pub quotas: Quotas,
    /// Set when the request was reduced to `max_feasible`.
    pub clamp: Option<ClampNotice>,
}

impl Distribution {
    /// Number of questions the quotas grant.
    pub fn granted(&self) -> usize {
        self.quotas.total()
    }
}

/// Largest standard-mode total for the given counts.
pub fn max_feasible_total(counts: &CategoryCounts) -> usize {
    STANDARD_RATIO.max_feasible(counts)
}

/// Standard-mode quotas for `total`.
pub fn quotas_for(total: usize) -> Quotas {
    STANDARD_RATIO.quotas(total)
}

/// Compute the standard-mode distribution for a requested total.
///
/// Requests above the feasible maximum are clamped, not rejected. A pool
/// that cannot support even one question under the ratio yields
/// [`ComposeError::InsufficientPool`].
pub fn compute_distribution(
    counts: &CategoryCounts,
    requested: usize,
) -> Result<Distribution, ComposeError> {
    if requested == 0 {
        return Err(ComposeError::EmptyRequest);
    }

    let max_feasible = max_feasible_total(counts);
    if max_feasible == 0 {
        return Err(ComposeError::InsufficientPool { counts: *counts });
    }

    let granted = requested.min(max_feasible);
    let clamp = (requested > max_feasible).then_some(ClampNotice { requested, granted });

    Ok(Distribution {
        max_feasible,
        requested,
        quotas: quotas_for(granted),
        clamp,
    })
}

/// Explicit per-tier counts for a hand-built exam.
///
/// Unlike the standard ratio, the matrix keeps Application and
/// HighApplication apart. Written as `NB=8,TH=6,VD=4,VDC=2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMatrix {
    pub recall: usize,
    pub comprehension: usize,
    pub application: usize,
    pub high_application: usize,
}

impl TierMatrix {
    pub fn new(
        recall: usize,
        comprehension: usize,
        application: usize,
        high_application: usize,
    ) -> Self {
        Self {
            recall,
            comprehension,
            application,
            high_application,
        }
    }

    /// Spread `total` as 40/30/20 over NB/TH/VD, rounded half-up, with the
    /// remainder going to VDC.
    pub fn auto_fill(total: usize) -> Self {
        let recall = round_half_up(total * 40, 100);
        let comprehension = round_half_up(total * 30, 100);
        let application = round_half_up(total * 20, 100);
        let high_application = total.saturating_sub(recall + comprehension + application);
        Self::new(recall, comprehension, application, high_application)
    }

    /// Count a pool's questions per tier.
    pub fn from_pool<'a, I>(pool: I) -> Self
    where
        I: IntoIterator<Item = &'a QuestionRecord>,
    {
        let mut counts = Self::default();
        for question in pool {
            *counts.slot_mut(question.difficulty) += 1;
        }
        counts
    }

    pub fn get(&self, tier: Difficulty) -> usize {
        match tier {
            Difficulty::Recall => self.recall,
            Difficulty::Comprehension => self.comprehension,
            Difficulty::Application => self.application,
            Difficulty::HighApplication => self.high_application,
        }
    }

    fn slot_mut(&mut self, tier: Difficulty) -> &mut usize {
        match tier {
            Difficulty::Recall => &mut self.recall,
            Difficulty::Comprehension => &mut self.comprehension,
            Difficulty::Application => &mut self.application,
            Difficulty::HighApplication => &mut self.high_application,
        }
    }

    pub fn total(&self) -> usize {
        self.recall + self.comprehension + self.application + self.high_application
    }
}

impl fmt::Display for TierMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Difficulty::ALL
            .into_iter()
            .map(|tier| format!("{}={}", tier.code(), self.get(tier)))
            .collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for TierMatrix {
    type Err = String;

    /// Tiers left out count as zero. Each tier may appear once.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut matrix = Self::default();
        let mut seen = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (tier, count) = part
                .split_once('=')
                .ok_or_else(|| format!("expected TIER=COUNT, got `{part}`"))?;
            let tier: Difficulty = tier.parse()?;
            let count: usize = count
                .trim()
                .parse()
                .map_err(|_| format!("invalid count for {}: `{}`", tier.code(), count.trim()))?;
            if seen.contains(&tier) {
                return Err(format!("{} given more than once", tier.code()));
            }
            seen.push(tier);
            *matrix.slot_mut(tier) = count;
        }
        Ok(matrix)
    }
}
