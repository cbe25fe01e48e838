//! Six-vote consensus over an [`IndicatorSnapshot`].
//!
//! Each rule casts a long vote, a short vote, or abstains. A rule abstains when
//! one of its inputs could not be computed, or when its indicators disagree
//! (for example an Alligator that is neither fanned up nor down). Abstentions
//! never count toward either side.

use crate::indicators::IndicatorSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

/// Votes needed on one side for a strong verdict.
pub const STRONG_VOTES: usize = 4;

const MFI_MIDLINE: Decimal = dec!(50);
const CMF_THRESHOLD: Decimal = dec!(0.05);
const AROON_THRESHOLD: Decimal = dec!(70);
const RSI_MIDLINE: Decimal = dec!(50);
const ADX_TREND_THRESHOLD: Decimal = dec!(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rule {
    EmaCross,
    Alligator,
    MoneyFlow,
    Aroon,
    Rsi,
    TrendStrength,
}

impl Rule {
    pub const ALL: [Rule; 6] = [
        Rule::EmaCross,
        Rule::Alligator,
        Rule::MoneyFlow,
        Rule::Aroon,
        Rule::Rsi,
        Rule::TrendStrength,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Abstention {
    /// An input indicator lacked history.
    MissingData,
    /// Inputs available but no side qualified.
    NoCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Vote {
    Long,
    Short,
    Abstain(Abstention),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrendLabel {
    StrongUp,
    StrongDown,
    Sideways,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendLabel::StrongUp => write!(f, "STRONG UP"),
            TrendLabel::StrongDown => write!(f, "STRONG DOWN"),
            TrendLabel::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusVerdict {
    pub long_votes: usize,
    pub short_votes: usize,
    pub abstentions: usize,
    pub trend: TrendLabel,
    pub votes: Vec<(Rule, Vote)>,
}

impl ConsensusVerdict {
    /// Tally per-rule votes into a verdict.
    pub fn from_votes(votes: Vec<(Rule, Vote)>) -> Self {
        let long_votes = votes.iter().filter(|(_, v)| *v == Vote::Long).count();
        let short_votes = votes.iter().filter(|(_, v)| *v == Vote::Short).count();
        let abstentions = votes.len() - long_votes - short_votes;

        let trend = if long_votes >= STRONG_VOTES {
            TrendLabel::StrongUp
        } else if short_votes >= STRONG_VOTES {
            TrendLabel::StrongDown
        } else {
            TrendLabel::Sideways
        };

        Self {
            long_votes,
            short_votes,
            abstentions,
            trend,
            votes,
        }
    }

    pub fn vote(&self, rule: Rule) -> Option<Vote> {
        self.votes.iter().find(|(r, _)| *r == rule).map(|(_, v)| *v)
    }
}

fn either(long: bool, short: bool) -> Vote {
    if long {
        Vote::Long
    } else if short {
        Vote::Short
    } else {
        Vote::Abstain(Abstention::NoCondition)
    }
}

const MISSING: Vote = Vote::Abstain(Abstention::MissingData);

fn ema_cross(s: &IndicatorSnapshot) -> Vote {
    match (s.ema21, s.ema50) {
        (Some(fast), Some(slow)) => either(fast > slow, fast <= slow),
        _ => MISSING,
    }
}

fn alligator(s: &IndicatorSnapshot) -> Vote {
    match &s.alligator {
        Some(lines) => either(lines.is_bullish(), lines.is_bearish()),
        None => MISSING,
    }
}

fn money_flow(s: &IndicatorSnapshot) -> Vote {
    match (s.mfi, s.cmf) {
        (Some(mfi), Some(cmf)) => either(
            mfi > MFI_MIDLINE && cmf > CMF_THRESHOLD,
            mfi < MFI_MIDLINE && cmf < -CMF_THRESHOLD,
        ),
        _ => MISSING,
    }
}

fn aroon(s: &IndicatorSnapshot) -> Vote {
    match &s.aroon {
        Some(a) => either(
            a.up > AROON_THRESHOLD && a.up > a.down,
            a.down > AROON_THRESHOLD && a.down > a.up,
        ),
        None => MISSING,
    }
}

fn rsi(s: &IndicatorSnapshot) -> Vote {
    match s.rsi {
        Some(r) => either(r > RSI_MIDLINE, r <= RSI_MIDLINE),
        None => MISSING,
    }
}

fn trend_strength(s: &IndicatorSnapshot) -> Vote {
    match (&s.dmi, &s.obv) {
        (Some(d), Some(o)) => {
            let trending = d.adx > ADX_TREND_THRESHOLD;
            either(
                trending && d.plus_di > d.minus_di && o.value > o.signal,
                trending && d.minus_di > d.plus_di && o.value < o.signal,
            )
        }
        _ => MISSING,
    }
}

/// Run all six rules against one snapshot.
pub fn evaluate(snapshot: &IndicatorSnapshot) -> ConsensusVerdict {
    let votes = Rule::ALL
        .iter()
        .map(|rule| {
            let vote = match rule {
                Rule::EmaCross => ema_cross(snapshot),
                Rule::Alligator => alligator(snapshot),
                Rule::MoneyFlow => money_flow(snapshot),
                Rule::Aroon => aroon(snapshot),
                Rule::Rsi => rsi(snapshot),
                Rule::TrendStrength => trend_strength(snapshot),
            };
            (*rule, vote)
        })
        .collect();
    ConsensusVerdict::from_votes(votes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{AlligatorLines, Aroon, Dmi, Obv};
    use crate::market::Candle;

    fn bullish_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema21: Some(dec!(110)),
            ema50: Some(dec!(100)),
            ema200: Some(dec!(90)),
            rsi: Some(dec!(65)),
            atr: Some(dec!(2)),
            dmi: Some(Dmi {
                adx: dec!(30),
                plus_di: dec!(28),
                minus_di: dec!(12),
            }),
            alligator: Some(AlligatorLines {
                jaw: dec!(100),
                teeth: dec!(102),
                lips: dec!(104),
            }),
            aroon: Some(Aroon {
                up: dec!(92.8571428571),
                down: dec!(7.1428571429),
            }),
            mfi: Some(dec!(62)),
            cmf: Some(dec!(0.12)),
            obv: Some(Obv {
                value: dec!(5000),
                signal: dec!(4000),
            }),
        }
    }

    fn bearish_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema21: Some(dec!(90)),
            ema50: Some(dec!(100)),
            ema200: Some(dec!(110)),
            rsi: Some(dec!(35)),
            atr: Some(dec!(2)),
            dmi: Some(Dmi {
                adx: dec!(30),
                plus_di: dec!(10),
                minus_di: dec!(25),
            }),
            alligator: Some(AlligatorLines {
                jaw: dec!(104),
                teeth: dec!(102),
                lips: dec!(100),
            }),
            aroon: Some(Aroon {
                up: dec!(0),
                down: dec!(100),
            }),
            mfi: Some(dec!(30)),
            cmf: Some(dec!(-0.2)),
            obv: Some(Obv {
                value: dec!(-100),
                signal: dec!(50),
            }),
        }
    }

    fn assert_sum(v: &ConsensusVerdict) {
        assert_eq!(v.long_votes + v.short_votes + v.abstentions, 6);
    }

    #[test]
    fn test_all_long() {
        let v = evaluate(&bullish_snapshot());
        assert_eq!(v.long_votes, 6);
        assert_eq!(v.trend, TrendLabel::StrongUp);
        assert_sum(&v);
    }

    #[test]
    fn test_all_short() {
        let v = evaluate(&bearish_snapshot());
        assert_eq!(v.short_votes, 6);
        assert_eq!(v.trend, TrendLabel::StrongDown);
        assert_sum(&v);
    }

    #[test]
    fn test_empty_snapshot_abstains_everywhere() {
        let v = evaluate(&IndicatorSnapshot::default());
        assert_eq!(v.abstentions, 6);
        assert_eq!(v.trend, TrendLabel::Sideways);
        assert!(v
            .votes
            .iter()
            .all(|(_, vote)| *vote == Vote::Abstain(Abstention::MissingData)));
    }

    #[test]
    fn test_missing_indicator_does_not_default_to_short() {
        // EMA21 <= EMA50 would vote short; without EMA50 it must abstain
        let mut s = bullish_snapshot();
        s.ema50 = None;
        s.rsi = None;
        let v = evaluate(&s);
        assert_eq!(v.vote(Rule::EmaCross), Some(MISSING));
        assert_eq!(v.vote(Rule::Rsi), Some(MISSING));
        assert_eq!(v.short_votes, 0);
        assert_eq!(v.long_votes, 4);
        assert_eq!(v.trend, TrendLabel::StrongUp);
    }

    #[test]
    fn test_mixed_flow_abstains() {
        let mut s = bullish_snapshot();
        s.cmf = Some(dec!(0.01));
        let v = evaluate(&s);
        assert_eq!(v.vote(Rule::MoneyFlow), Some(Vote::Abstain(Abstention::NoCondition)));
    }

    #[test]
    fn test_weak_adx_abstains() {
        let mut s = bullish_snapshot();
        if let Some(d) = s.dmi.as_mut() {
            d.adx = dec!(25);
        }
        let v = evaluate(&s);
        assert_eq!(v.vote(Rule::TrendStrength), Some(Vote::Abstain(Abstention::NoCondition)));
    }

    #[test]
    fn test_equal_emas_vote_short() {
        let mut s = bullish_snapshot();
        s.ema21 = Some(dec!(100));
        s.rsi = Some(dec!(50));
        let v = evaluate(&s);
        assert_eq!(v.vote(Rule::EmaCross), Some(Vote::Short));
        assert_eq!(v.vote(Rule::Rsi), Some(Vote::Short));
    }

    #[test]
    fn test_verdict_thresholds_for_all_distributions() {
        for long in 0..=6usize {
            for short in 0..=(6 - long) {
                let mut votes = Vec::new();
                for (i, rule) in Rule::ALL.iter().enumerate() {
                    let vote = if i < long {
                        Vote::Long
                    } else if i < long + short {
                        Vote::Short
                    } else {
                        Vote::Abstain(Abstention::NoCondition)
                    };
                    votes.push((*rule, vote));
                }
                let v = ConsensusVerdict::from_votes(votes);
                assert_sum(&v);
                let expected = if long >= 4 {
                    TrendLabel::StrongUp
                } else if short >= 4 {
                    TrendLabel::StrongDown
                } else {
                    TrendLabel::Sideways
                };
                assert_eq!(v.trend, expected, "long={} short={}", long, short);
            }
        }
    }

    #[test]
    fn test_steady_uptrend_votes_long_on_ema() {
        let candles: Vec<Candle> = (0..300)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i);
                Candle::new(i, close - dec!(0.5), close + dec!(0.5), close - dec!(1), close, dec!(10))
            })
            .collect();
        let v = evaluate(&IndicatorSnapshot::compute(&candles));
        assert_eq!(v.vote(Rule::EmaCross), Some(Vote::Long));
        assert_eq!(v.vote(Rule::Rsi), Some(Vote::Long));
        assert_sum(&v);
    }
}
