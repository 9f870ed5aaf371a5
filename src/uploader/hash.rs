// 内容摘要
//
// 与历代 Web 端上传实现逐位一致的自研块散列：
// - 4 个 32 位链值，初始向量与 MD5 相同
// - 轮常量和消息扩展取自 SHA-256，每 64 字节块压缩 64 轮
// - 填充尾部的 8 字节长度字段写入的是截断为 32 位的比特长度，重复两次
//
// 服务端按同一算法校验 block_list，替换成标准 MD5/SHA 会导致 create 阶段
// 清单校验失败，因此必须自包含实现，不走 crypto crate。

use std::fmt;

/// 轮常量（与 SHA-256 相同）
const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// 初始链值（与 MD5 相同）
const H0: [u32; 4] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476];

/// 128 位内容摘要，对外形式为小写十六进制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digest([u32; 4]);

impl Digest {
    /// 小写十六进制表示（线上协议使用的形式）
    pub fn to_hex(&self) -> String {
        format!(
            "{:08x}{:08x}{:08x}{:08x}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// 流式摘要计算器
///
/// 整文件摘要和逐分片摘要共用同一实现；两者是相互独立的值，
/// 整文件摘要不等于分片摘要的任何组合。
#[derive(Debug, Clone)]
pub struct ContentHasher {
    state: [u32; 4],
    buffer: [u8; 64],
    buffered: usize,
    total_len: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            state: H0,
            buffer: [0u8; 64],
            buffered: 0,
            total_len: 0,
        }
    }

    pub fn update(&mut self, mut data: &[u8]) {
        self.total_len += data.len() as u64;

        // 先补满残留的半块
        if self.buffered > 0 {
            let take = (64 - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];
            if self.buffered == 64 {
                let block = self.buffer;
                compress(&mut self.state, &block);
                self.buffered = 0;
            }
        }

        // 整块直接压缩
        while data.len() >= 64 {
            let mut block = [0u8; 64];
            block.copy_from_slice(&data[..64]);
            compress(&mut self.state, &block);
            data = &data[64..];
        }

        if !data.is_empty() {
            self.buffer[..data.len()].copy_from_slice(data);
            self.buffered = data.len();
        }
    }

    pub fn finalize(mut self) -> Digest {
        // 填充：0x80 + 若干 0x00，补齐到块内第 56 字节
        let pad_len = (56 + 64 - (self.total_len as usize + 1) % 64) % 64;
        let mut tail = Vec::with_capacity(1 + pad_len + 8);
        tail.push(0x80u8);
        tail.extend(std::iter::repeat(0u8).take(pad_len));

        // 长度字段：比特长度截断为 32 位后重复写两次（线上实现如此，
        // 为保持摘要一致必须原样保留）
        let bits = self.total_len.wrapping_mul(8) as u32;
        let mut length_field = [0u8; 8];
        for i in 0..8 {
            length_field[7 - i] = (bits >> ((i * 8) % 32)) as u8;
        }
        tail.extend_from_slice(&length_field);

        self.update(&tail);
        debug_assert_eq!(self.buffered, 0);

        Digest(self.state)
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// 一次性计算摘要
pub fn digest(data: &[u8]) -> Digest {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn compress(state: &mut [u32; 4], block: &[u8; 64]) {
    let mut w = [0u32; 64];
    for (j, word) in w.iter_mut().take(16).enumerate() {
        *word = u32::from_be_bytes([
            block[j * 4],
            block[j * 4 + 1],
            block[j * 4 + 2],
            block[j * 4 + 3],
        ]);
    }
    for j in 16..64 {
        let s0 = w[j - 15].rotate_right(7) ^ w[j - 15].rotate_right(18) ^ (w[j - 15] >> 3);
        let s1 = w[j - 2].rotate_right(17) ^ w[j - 2].rotate_right(19) ^ (w[j - 2] >> 10);
        w[j] = w[j - 16]
            .wrapping_add(s0)
            .wrapping_add(w[j - 7])
            .wrapping_add(s1);
    }

    let [mut a, mut b, mut c, mut d] = *state;
    for j in 0..64 {
        let s1 = b.rotate_right(6) ^ b.rotate_right(11) ^ b.rotate_right(25);
        let ch = (b & c) ^ (!b & d);
        let t1 = d
            .wrapping_add(s1)
            .wrapping_add(ch)
            .wrapping_add(K[j])
            .wrapping_add(w[j]);
        let s0 = a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t2 = s0.wrapping_add(maj);
        d = c;
        c = b;
        b = a.wrapping_add(t1);
        a = t1.wrapping_add(t2);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}

#[cfg(test)]
mod tests {
    use super::*;

    // 期望值取自 Web 端同算法的输出，属于协议契约，不可改动
    #[test]
    fn test_known_vectors() {
        assert_eq!(digest(b"").to_hex(), "62ea1dbee95c55392111d111cc7b8c34");
        assert_eq!(digest(b"abc").to_hex(), "5f92ffb93c99bf90e0458d93ff8335d1");
        assert_eq!(
            digest(b"hello world").to_hex(),
            "f91f4601dcfafc0f8abbd975f5a60f7d"
        );
        assert_eq!(
            digest(b"The quick brown fox jumps over the lazy dog").to_hex(),
            "830d1c9d5fad5a5d5f47d314bd043b15"
        );
    }

    #[test]
    fn test_block_boundaries() {
        // 56/63/64 字节覆盖填充逻辑的三种分支
        assert_eq!(
            digest(&[b'a'; 56]).to_hex(),
            "30de76a0868f382067af6002e159689d"
        );
        assert_eq!(
            digest(&[b'a'; 63]).to_hex(),
            "5fdbb367d12e36e9fb8b976c231aad2f"
        );
        assert_eq!(
            digest(&[b'a'; 64]).to_hex(),
            "fd6e876140b858e33e63f4c988440f8d"
        );
    }

    #[test]
    fn test_longer_inputs() {
        assert_eq!(
            digest(&vec![b'a'; 1000]).to_hex(),
            "01afe14aa87ad6a6b685d1b455ef07bc"
        );
        let all_bytes: Vec<u8> = (0u8..=255).collect();
        assert_eq!(
            digest(&all_bytes).to_hex(),
            "31476b506b1f22beb4d75df0fe6f0f63"
        );
    }

    #[test]
    fn test_deterministic() {
        let data = b"determinism check";
        assert_eq!(digest(data), digest(data));
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let oneshot = digest(&data);

        // 任意切分喂入，结果必须一致
        for split in [1usize, 7, 63, 64, 65, 4096] {
            let mut hasher = ContentHasher::new();
            for part in data.chunks(split) {
                hasher.update(part);
            }
            assert_eq!(hasher.finalize(), oneshot, "split={}", split);
        }
    }
}
