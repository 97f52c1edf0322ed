use hla::memory::{Endian, Memory, Padding, RegionKind};

#[test]
fn overflow_boundary() {
    let mut memory = Memory::new(Endian::Little);
    let r = memory.new_region(RegionKind::Rom, Some(0x8000), Some(4), None);
    assert_eq!(memory.append_bytes(r, &[1, 2, 3]), Ok(0));
    assert_eq!(memory[r].free(), Some(1));
    assert_eq!(memory.append_bytes(r, &[4]), Ok(3));
    assert_eq!(memory[r].cursor(), Some(0x8004));

    let e = memory.append_bytes(r, &[5]).unwrap_err();
    assert_eq!((e.region, e.requested, e.used, e.max), (r, 1, 4, 4));
    assert_eq!(memory[r].content, vec![1, 2, 3, 4]);

    // unbounded regions take anything
    assert_eq!(memory.append_bytes(0, &[0; 1000]), Ok(0));
    assert_eq!(memory[0].free(), None);
}

#[test]
fn tags() {
    let mut memory = Memory::default();
    let a = memory.new_region(RegionKind::Rom, None, Some(16), None);
    assert!(memory.tag("a"));
    let b = memory.new_region(RegionKind::Ram, Some(0x200), None, None);
    assert!(!memory.tag("a"));
    assert!(memory.tag("b"));
    assert_eq!(memory.current(), b);

    assert!(memory.select("a"));
    assert_eq!(memory.current(), a);
    assert!(!memory.select("missing"));
    assert_eq!(memory.current(), a);

    assert_eq!(memory["b"].origin, Some(0x200));
    assert_eq!(memory.get("a").and_then(|r| r.max_size), Some(16));
    assert!(memory.get("missing").is_none());
    assert!(memory.get(9).is_none());
    assert_eq!(memory.tags().collect::<Vec<_>>(), [("a", a), ("b", b)]);
}

#[test]
fn emit_alignment() {
    let mut memory = Memory::new(Endian::Big);
    let r = memory.new_region(RegionKind::Rom, None, None, Some(Padding::Value(0x1234)));
    memory.append_bytes(r, &[0xFF]).unwrap();
    assert_eq!(memory.emit(r), vec![0xFF]);

    memory.set_alignment(r, 6);
    assert_eq!(memory.emit(r), vec![0xFF, 0x12, 0x34, 0x12, 0x34, 0x12]);
    assert_eq!(memory[r].len(), 1);

    memory.set_padding(r, Padding::Text("ab".to_string()));
    assert_eq!(memory.emit(r), b"\xFFababa".to_vec());

    let plain = memory.new_region(RegionKind::Rom, None, None, None);
    memory.append_bytes(plain, &[1, 2]).unwrap();
    memory.set_alignment(plain, 4);
    assert_eq!(memory.emit(plain), vec![1, 2, 0, 0]);
}

#[test]
fn endian_bytes() {
    assert_eq!(Endian::Little.bytes(0x1234, 2), vec![0x34, 0x12]);
    assert_eq!(Endian::Big.bytes(0x1234, 2), vec![0x12, 0x34]);
    assert_eq!(Endian::Little.bytes(0x1_0203, 2), vec![0x03, 0x02]);
    assert_eq!(Padding::Value(0xEA).pattern(Endian::Big), vec![0xEA]);
    assert_eq!(Padding::Value(0x10000).pattern(Endian::Big), vec![0, 1, 0, 0]);
}

#[test]
fn json() {
    let mut memory = Memory::new(Endian::Little);
    memory.bank_size = Some(0x4000);
    memory.new_region(RegionKind::Ram, Some(0), Some(0x800), None);
    memory.append_bytes(1, &[0; 3]).unwrap();
    memory.new_region(RegionKind::Rom, None, None, Some(Padding::Text("x".to_string())));
    memory.tag("code");

    let json = memory.to_json().unwrap();
    assert!(json.contains("\"code\""));
    let back = Memory::from_json(&json).unwrap();
    assert_eq!(back, memory);
    assert_eq!(back.current(), 2);
    assert!(Memory::from_json("{").is_err());
}
