//! 串口字节流拆包测试
//!
//! 用随机负载、随机噪声和随机分片模拟真实串口读取。

use kobuki_protocol::{PacketFinder, encode_packet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_payload(rng: &mut StdRng) -> Vec<u8> {
    let len = rng.gen_range(0..=64);
    (0..len).map(|_| rng.r#gen::<u8>()).collect()
}

/// 不含包头字节的噪声
fn random_noise(rng: &mut StdRng) -> Vec<u8> {
    let len = rng.gen_range(0..8);
    (0..len)
        .map(|_| loop {
            let b = rng.r#gen::<u8>();
            if b != 0xAA {
                break b;
            }
        })
        .collect()
}

#[test]
fn test_random_chunking_recovers_every_packet() {
    let mut rng = StdRng::seed_from_u64(0x6b6f_6275_6b69);

    for _ in 0..50 {
        let payloads: Vec<Vec<u8>> = (0..20).map(|_| random_payload(&mut rng)).collect();

        let mut stream = Vec::new();
        for payload in &payloads {
            stream.extend(random_noise(&mut rng));
            stream.extend(encode_packet(payload).unwrap());
        }

        let mut finder = PacketFinder::new();
        let mut found = Vec::new();
        let mut rest = stream.as_slice();
        while !rest.is_empty() {
            let n = rng.gen_range(1..=rest.len().min(32));
            let (chunk, tail) = rest.split_at(n);
            found.extend(finder.extend(chunk));
            rest = tail;
        }

        let found: Vec<Vec<u8>> = found.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(found, payloads);
    }
}

#[test]
fn test_single_bit_flip_is_detected() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let mut payload = random_payload(&mut rng);
        payload.push(0x01);
        let mut packet = encode_packet(&payload).unwrap();

        // 只翻转 payload 或校验和，不动包头与长度
        let index = rng.gen_range(3..packet.len());
        let bit = 1u8 << rng.gen_range(0..8);
        packet[index] ^= bit;

        let mut finder = PacketFinder::new();
        let found = finder.extend(&packet);
        assert_eq!(found.len(), 1);
        assert!(found[0].is_err());
    }
}
