pub const SIGMA: usize = 6; // {0:$, 1:A, 2:C, 3:G, 4:T, 5:N}

/// 读段终止符 `$` 的编码
pub const SENTINEL: u8 = 0;

/// 可出现在读段内部的符号编码（不含 `$`）
pub const BASES: std::ops::Range<u8> = 1..SIGMA as u8;

const SYMBOLS: [u8; SIGMA] = *b"$ACGTN";

/// 规范化单个碱基：大写，U 视为 T，其余非 ACGT 字符视为 N
#[inline]
fn normalize_base(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        up @ (b'A' | b'C' | b'G' | b'T' | b'N') => up,
        b'U' => b'T',
        _ => b'N',
    }
}

/// 规范化后的碱基编码为 1..=5
#[inline]
fn code_of(base: u8) -> u8 {
    match base {
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'T' => 4,
        _ => 5,
    }
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| normalize_base(b)).collect()
}

/// 将 ASCII 序列编码为字母表（先做规范化）
pub fn encode(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| code_of(normalize_base(b))).collect()
}

/// 将字母表编码解码回 ASCII，越界编码输出 N
pub fn decode(codes: &[u8]) -> Vec<u8> {
    codes.iter().map(|&a| SYMBOLS.get(a as usize).copied().unwrap_or(b'N')).collect()
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match normalize_base(base) {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

/// 编码空间的互补：A<->T, C<->G, N 与 `$` 不变
#[inline]
pub fn complement_code(a: u8) -> u8 {
    match a {
        1..=4 => 5 - a,
        other => other,
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// 编码空间的反向互补
pub fn revcomp_codes(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&a| complement_code(a)).collect()
}

/// 编码空间的逐位互补（不反转）
pub fn complement_codes(codes: &[u8]) -> Vec<u8> {
    codes.iter().map(|&a| complement_code(a)).collect()
}
