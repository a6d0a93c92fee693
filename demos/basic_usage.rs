//! Basic usage examples for cow-radix.

use std::ops::ControlFlow;

use cow_radix::{Decoder, Encoder, EncoderConfig, RadixTree, Unit, Utf8};

fn main() {
    example_tree();
    example_snapshot();
    example_persistence();
}

fn example_tree() {
    println!("=== RadixTree ===\n");

    let mut tree: RadixTree<String> = RadixTree::new();
    tree.replace_or_insert(b"http://example.com/page1", "one".to_string());
    tree.replace_or_insert(b"http://example.com/page2", "two".to_string());
    tree.replace_or_insert(b"http://other.com/page1", "three".to_string());

    println!("example.com/page1 = {:?}", tree.get(b"http://example.com/page1"));
    println!("Contains other.com/page2: {}", tree.contains(b"http://other.com/page2"));
    println!("Count: {}", tree.len());

    println!("Walk (segments per node):");
    let _ = tree.walk(|segments, value| {
        let parts: Vec<_> = segments.iter().map(|s| String::from_utf8_lossy(s)).collect();
        println!("  {} -> {}", parts.join(" | "), value);
        ControlFlow::Continue(())
    });
    println!();
}

fn example_snapshot() {
    println!("=== Snapshots ===\n");

    let mut live: RadixTree<()> = RadixTree::new();
    for key in ["romane", "romanus", "romulus", "rubens", "ruber"] {
        live.insert(key.as_bytes());
    }

    let frozen = live.snapshot();
    live.delete(b"romulus");
    live.insert(b"rubicon");

    let show = |t: &RadixTree<()>| {
        t.keys()
            .map(|k| String::from_utf8_lossy(&k).into_owned())
            .collect::<Vec<_>>()
    };
    println!("live:   {:?}", show(&live));
    println!("frozen: {:?}\n", show(&frozen));
}

fn example_persistence() {
    println!("=== Persistence ===\n");

    let mut tree: RadixTree<()> = RadixTree::new();
    for i in 0..10_000 {
        tree.insert(format!("/var/log/app/{:05}.log", i).as_bytes());
    }

    let plain = Encoder::new(Unit).encode(&tree).unwrap();
    let packed = Encoder::with_config(Unit, EncoderConfig::gzip())
        .encode(&tree)
        .unwrap();
    println!("opcode stream: {} bytes, gzip: {} bytes", plain.len(), packed.len());

    let back: RadixTree<()> = Decoder::new(Unit).decode(&packed).unwrap();
    println!("reloaded {} keys", back.len());

    let mut labels: RadixTree<String> = RadixTree::new();
    labels.replace_or_insert(b"en", "hello".to_string());
    labels.replace_or_insert(b"en-GB", "hello".to_string());
    let mut out = Vec::new();
    labels.write_to(&mut out, Utf8).unwrap();
    let labels: RadixTree<String> = RadixTree::read_from(&out[..], Utf8).unwrap();
    println!("labels: {:?}", labels);
}
