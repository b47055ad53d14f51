use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Kahan summation for improved numerical stability when summing floating-point numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub fn incr(&mut self, inc: f64) {
        let (new_sum, new_compensation) = kahan_inc(inc, self.sum, self.compensation);
        self.sum = new_sum;
        self.compensation = new_compensation;
    }

    /// The compensated sum.
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl AddAssign<f64> for KahanSum {
    fn add_assign(&mut self, rhs: f64) {
        self.incr(rhs);
    }
}

impl AddAssign<&KahanSum> for KahanSum {
    fn add_assign(&mut self, rhs: &KahanSum) {
        let compensation = self.compensation + rhs.compensation;
        self.compensation = 0.0;
        self.incr(rhs.sum);
        self.compensation += compensation;
    }
}

/// Kahan summation increment with Neumaier improvement (1974)
///
/// The Neumaier variant handles the case where the next term is larger than
/// the running sum, which the original Kahan algorithm (1965) did not address.
///
/// Returns (new_sum, new_compensation)
#[inline(never)]
// Not inlined: reordering of the floating-point operations loses precision.
fn kahan_inc(inc: f64, sum: f64, c: f64) -> (f64, f64) {
    let t = sum + inc;

    let new_c = if t.is_infinite() {
        0.0
    } else if sum.abs() >= inc.abs() {
        c + ((sum - t) + inc)
    } else {
        c + ((inc - t) + sum)
    };

    (t, new_c)
}
