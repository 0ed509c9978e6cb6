use super::fm::FmIndex;
use crate::util::dna::SIGMA;

/// 变换空间中的半开区间 [lower, upper)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub lower: usize,
    pub upper: usize,
}

impl Interval {
    #[inline]
    pub fn new(lower: usize, upper: usize) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.upper.saturating_sub(self.lower)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.upper <= self.lower
    }
}

/// 同一模式在主索引与副索引中的区间。副索引索引的是反转文本，
/// 所以向左扩展主区间等价于向右扩展副区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalPair {
    pub primary: Interval,
    pub secondary: Interval,
}

impl IntervalPair {
    #[inline]
    pub fn swapped(self) -> Self {
        Self { primary: self.secondary, secondary: self.primary }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.primary.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

/// 双向搜索所用的一对索引（共享只读）
#[derive(Debug, Clone, Copy)]
pub struct IndexPair<'a> {
    pub primary: &'a FmIndex,
    pub secondary: &'a FmIndex,
}

impl<'a> IndexPair<'a> {
    pub fn new(primary: &'a FmIndex, secondary: &'a FmIndex) -> Self {
        Self { primary, secondary }
    }

    #[inline]
    pub fn swapped(self) -> Self {
        Self { primary: self.secondary, secondary: self.primary }
    }

    /// 空模式对应的区间：全部行
    pub fn full(&self) -> IntervalPair {
        IntervalPair {
            primary: Interval::new(0, self.primary.len()),
            secondary: Interval::new(0, self.secondary.len()),
        }
    }

    /// 模式 P -> cP。副区间内按 P 之后（反转文本中）的下一个符号排序，
    /// 因此其新下界为所有小于 c 的前驱符号的计数之和。
    pub fn extend_left(&self, pair: IntervalPair, c: u8) -> IntervalPair {
        let fm = self.primary;
        let lo = fm.occ_all(pair.primary.lower);
        let hi = fm.occ_all(pair.primary.upper);
        let ci = c as usize;
        let base = fm.c[ci] as usize;
        let primary = Interval::new(base + lo[ci] as usize, base + hi[ci] as usize);

        let mut smaller = 0usize;
        for b in 0..ci.min(SIGMA) {
            smaller += (hi[b] - lo[b]) as usize;
        }
        let sec_lower = pair.secondary.lower + smaller;
        let secondary = Interval::new(sec_lower, sec_lower + primary.size());
        IntervalPair { primary, secondary }
    }

    /// 模式 P -> Pc
    pub fn extend_right(&self, pair: IntervalPair, c: u8) -> IntervalPair {
        self.swapped().extend_left(pair.swapped(), c).swapped()
    }

    /// 从右往左精确匹配整个模式；不匹配时返回空区间
    pub fn search_exact(&self, pattern: &[u8]) -> IntervalPair {
        let mut pair = self.full();
        for &c in pattern.iter().rev() {
            pair = self.extend_left(pair, c);
            if pair.is_empty() {
                break;
            }
        }
        pair
    }
}
