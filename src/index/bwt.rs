use super::sa::SaElem;
use crate::util::dna::SENTINEL;

/// 根据后缀数组构建多串 BWT。
/// `reads` 为数值化读段（1..SIGMA），`sa` 为按行排列的 (读段, 偏移)。
/// 每条读段循环地以自己的 `$` 结尾：偏移 0 的前驱为 `$`，其余为读段内前一个符号。
pub fn build_bwt(reads: &[Vec<u8>], sa: &[SaElem]) -> Vec<u8> {
    let mut bwt = Vec::with_capacity(sa.len());
    for e in sa {
        let p = e.pos as usize;
        let prev = if p == 0 { SENTINEL } else { reads[e.id as usize][p - 1] };
        bwt.push(prev);
    }
    bwt
}
