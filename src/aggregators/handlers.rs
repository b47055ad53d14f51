// The handler set follows
// https://github.com/cryptorelay/redis-aggregation/tree/master
// License: Apache License 2.0

use super::{AggregationType, KahanSum};
use crate::error::{FacetError, FacetResult};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

type Value = f64;

#[enum_dispatch]
pub trait AggregationHandler {
    fn update(&mut self, value: Value);
    fn current(&self) -> Option<Value>;
    fn empty_value(&self) -> Value {
        f64::NAN
    }
    fn value(&self) -> Value {
        self.current().unwrap_or_else(|| self.empty_value())
    }
}

/// Combines two partial states of the same handler, e.g. from two partitions.
pub trait MergeableHandler {
    fn merge(&mut self, other: &Self);
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinAggregator(Option<Value>);
impl AggregationHandler for MinAggregator {
    fn update(&mut self, value: Value) {
        self.0 = Some(match self.0 {
            None => value,
            Some(v) => v.min(value),
        });
    }
    fn current(&self) -> Option<Value> {
        self.0
    }
}

impl MergeableHandler for MinAggregator {
    fn merge(&mut self, other: &Self) {
        if let Some(v) = other.0 {
            self.update(v);
        }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaxAggregator(Option<Value>);
impl AggregationHandler for MaxAggregator {
    fn update(&mut self, value: Value) {
        self.0 = Some(match self.0 {
            None => value,
            Some(v) => v.max(value),
        });
    }
    fn current(&self) -> Option<Value> {
        self.0
    }
}

impl MergeableHandler for MaxAggregator {
    fn merge(&mut self, other: &Self) {
        if let Some(v) = other.0 {
            self.update(v);
        }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeAggregator {
    min: Value,
    max: Value,
    init: bool,
}
impl AggregationHandler for RangeAggregator {
    fn update(&mut self, value: Value) {
        if !self.init {
            self.init = true;
            self.min = value;
            self.max = value;
        } else {
            self.max = self.max.max(value);
            self.min = self.min.min(value);
        }
    }
    fn current(&self) -> Option<Value> {
        if !self.init {
            None
        } else {
            Some(self.max - self.min)
        }
    }
}

impl MergeableHandler for RangeAggregator {
    fn merge(&mut self, other: &Self) {
        if other.init {
            self.update(other.min);
            self.update(other.max);
        }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvgAggregator {
    count: usize,
    sum: KahanSum,
}
impl AggregationHandler for AvgAggregator {
    fn update(&mut self, value: Value) {
        self.sum += value;
        self.count += 1;
    }
    fn current(&self) -> Option<Value> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum.value() / self.count as f64)
        }
    }
}

impl MergeableHandler for AvgAggregator {
    fn merge(&mut self, other: &Self) {
        self.sum += &other.sum;
        self.count += other.count;
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct SumAggregator(KahanSum);
impl AggregationHandler for SumAggregator {
    fn update(&mut self, value: Value) {
        self.0 += value;
    }
    fn current(&self) -> Option<Value> {
        Some(self.0.value())
    }
    fn empty_value(&self) -> Value {
        0.
    }
}

impl MergeableHandler for SumAggregator {
    fn merge(&mut self, other: &Self) {
        self.0 += &other.0;
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountAggregator(usize);
impl AggregationHandler for CountAggregator {
    fn update(&mut self, _value: Value) {
        self.0 += 1;
    }
    fn current(&self) -> Option<Value> {
        Some(self.0 as Value)
    }
    fn empty_value(&self) -> Value {
        0.
    }
}

impl MergeableHandler for CountAggregator {
    fn merge(&mut self, other: &Self) {
        self.0 += other.0;
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggStd {
    sum: KahanSum,
    sum_2: KahanSum,
    count: usize,
}

impl AggStd {
    fn add(&mut self, value: Value) {
        self.sum += value;
        self.sum_2 += value * value;
        self.count += 1;
    }
    fn merge(&mut self, other: &AggStd) {
        self.sum += &other.sum;
        self.sum_2 += &other.sum_2;
        self.count += other.count;
    }
    fn variance(&self) -> Value {
        //  var(X) = sum((x_i - E[X])^2)
        //  = sum(x_i^2) - 2 * sum(x_i) * E[X] + E^2[X]
        if self.count <= 1 {
            0.
        } else {
            let sum = self.sum.value();
            let avg = sum / self.count as Value;
            let m2 = self.sum_2.value() - 2. * sum * avg + avg * avg * self.count as Value;
            m2.max(0.)
        }
    }
    fn population(&self) -> Option<Value> {
        match self.count {
            0 => None,
            n => Some(self.variance() / n as Value),
        }
    }
    fn sample(&self) -> Option<Value> {
        match self.count {
            0 => None,
            1 => Some(0.),
            n => Some(self.variance() / (n - 1) as Value),
        }
    }
}

// boxed to minimize size of stack Aggregator enum
pub(crate) type OnlineAggregator = Box<AggStd>;

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarPAggregator(OnlineAggregator);
impl AggregationHandler for VarPAggregator {
    fn update(&mut self, value: Value) {
        self.0.add(value)
    }
    fn current(&self) -> Option<Value> {
        self.0.population()
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarSAggregator(OnlineAggregator);
impl AggregationHandler for VarSAggregator {
    fn update(&mut self, value: Value) {
        self.0.add(value)
    }
    fn current(&self) -> Option<Value> {
        self.0.sample()
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdPAggregator(OnlineAggregator);
impl AggregationHandler for StdPAggregator {
    fn update(&mut self, value: Value) {
        self.0.add(value)
    }
    fn current(&self) -> Option<Value> {
        self.0.population().map(f64::sqrt)
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct StdSAggregator(OnlineAggregator);
impl AggregationHandler for StdSAggregator {
    fn update(&mut self, value: Value) {
        self.0.add(value)
    }
    fn current(&self) -> Option<Value> {
        self.0.sample().map(f64::sqrt)
    }
}

macro_rules! online_mergeable {
    ($($name:ident),*) => {
        $(
            impl MergeableHandler for $name {
                fn merge(&mut self, other: &Self) {
                    self.0.merge(&other.0);
                }
            }
        )*
    };
}

online_mergeable!(VarPAggregator, VarSAggregator, StdPAggregator, StdSAggregator);

#[enum_dispatch(AggregationHandler)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Aggregator {
    Min(MinAggregator),
    Max(MaxAggregator),
    Avg(AvgAggregator),
    Sum(SumAggregator),
    Count(CountAggregator),
    Range(RangeAggregator),
    StdS(StdSAggregator),
    StdP(StdPAggregator),
    VarS(VarSAggregator),
    VarP(VarPAggregator),
}

impl From<AggregationType> for Aggregator {
    fn from(agg: AggregationType) -> Self {
        match agg {
            AggregationType::Avg => Aggregator::Avg(AvgAggregator::default()),
            AggregationType::Count => Aggregator::Count(CountAggregator::default()),
            AggregationType::Max => Aggregator::Max(MaxAggregator::default()),
            AggregationType::Min => Aggregator::Min(MinAggregator::default()),
            AggregationType::Range => Aggregator::Range(RangeAggregator::default()),
            AggregationType::StdP => Aggregator::StdP(StdPAggregator::default()),
            AggregationType::StdS => Aggregator::StdS(StdSAggregator::default()),
            AggregationType::VarP => Aggregator::VarP(VarPAggregator::default()),
            AggregationType::VarS => Aggregator::VarS(VarSAggregator::default()),
            AggregationType::Sum => Aggregator::Sum(SumAggregator::default()),
        }
    }
}

impl Aggregator {
    pub fn new(aggr: AggregationType) -> Self {
        aggr.into()
    }

    pub fn aggregation_type(&self) -> AggregationType {
        match self {
            Aggregator::Min(_) => AggregationType::Min,
            Aggregator::Max(_) => AggregationType::Max,
            Aggregator::Avg(_) => AggregationType::Avg,
            Aggregator::Sum(_) => AggregationType::Sum,
            Aggregator::Count(_) => AggregationType::Count,
            Aggregator::Range(_) => AggregationType::Range,
            Aggregator::StdP(_) => AggregationType::StdP,
            Aggregator::StdS(_) => AggregationType::StdS,
            Aggregator::VarP(_) => AggregationType::VarP,
            Aggregator::VarS(_) => AggregationType::VarS,
        }
    }

    /// Folds another partial of the same aggregation type into this one.
    pub fn merge(&mut self, other: &Aggregator) -> FacetResult {
        match (self, other) {
            (Aggregator::Min(a), Aggregator::Min(b)) => a.merge(b),
            (Aggregator::Max(a), Aggregator::Max(b)) => a.merge(b),
            (Aggregator::Avg(a), Aggregator::Avg(b)) => a.merge(b),
            (Aggregator::Sum(a), Aggregator::Sum(b)) => a.merge(b),
            (Aggregator::Count(a), Aggregator::Count(b)) => a.merge(b),
            (Aggregator::Range(a), Aggregator::Range(b)) => a.merge(b),
            (Aggregator::StdP(a), Aggregator::StdP(b)) => a.merge(b),
            (Aggregator::StdS(a), Aggregator::StdS(b)) => a.merge(b),
            (Aggregator::VarP(a), Aggregator::VarP(b)) => a.merge(b),
            (Aggregator::VarS(a), Aggregator::VarS(b)) => a.merge(b),
            (this, other) => {
                return Err(FacetError::mismatch(
                    None,
                    this.aggregation_type().name(),
                    other.aggregation_type().name(),
                ))
            }
        }
        Ok(())
    }
}
