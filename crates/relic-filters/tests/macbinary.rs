use std::time::{Duration, UNIX_EPOCH};

use relic_filters::{Filter, MemSource, is_macbinary};

/// Assemble a MacBinary II wrapper around the given forks.
fn build_macbinary(name: &str, data: &[u8], resource: &[u8], mod_mac_secs: u32) -> Vec<u8> {
    let mut header = [0u8; 128];
    header[1] = name.len() as u8;
    header[2..2 + name.len()].copy_from_slice(name.as_bytes());
    header[65..69].copy_from_slice(b"DIMG"); // file type
    header[69..73].copy_from_slice(b"RLIC"); // creator
    header[83..87].copy_from_slice(&(data.len() as u32).to_be_bytes());
    header[87..91].copy_from_slice(&(resource.len() as u32).to_be_bytes());
    header[91..95].copy_from_slice(&mod_mac_secs.to_be_bytes()); // creation
    header[95..99].copy_from_slice(&mod_mac_secs.to_be_bytes()); // modification
    header[122] = 129;
    header[123] = 129;

    let mut out = header.to_vec();
    out.extend_from_slice(data);
    while out.len() % 128 != 0 {
        out.push(0);
    }
    out.extend_from_slice(resource);
    while out.len() % 128 != 0 {
        out.push(0);
    }
    out
}

#[test]
fn unwraps_forks_and_mac_dates() {
    let data = vec![0x42u8; 300];
    let resource = vec![0x24u8; 17];
    // 0xB2C4E400 Mac seconds == 916_534_144 Unix seconds.
    let container = build_macbinary("disk.img", &data, &resource, 0xB2C4_E400);

    let mut filter = Filter::from_bytes("disk.img.bin", container).unwrap();
    assert_eq!(filter.length(), 300);
    assert_eq!(filter.resource_fork_length(), 17);
    assert_eq!(
        filter.last_write_time(),
        Some(UNIX_EPOCH + Duration::from_secs(916_534_144))
    );

    let mut buf = vec![0u8; 300];
    filter.read_at(0, &mut buf).unwrap();
    assert_eq!(buf, data);

    let mut rsrc = vec![0u8; 17];
    filter.read_resource_at(0, &mut rsrc).unwrap();
    assert_eq!(rsrc, resource);
}

#[test]
fn data_only_wrapper_has_no_resource_fork() {
    let container = build_macbinary("a", b"payload", &[], 0);
    let filter = Filter::from_bytes("a.bin", container).unwrap();
    assert_eq!(filter.length(), 7);
    assert!(!filter.has_resource_fork());
}

#[test]
fn structural_checks_reject_near_misses() {
    let good = build_macbinary("b", b"x", &[], 0);

    let mut bad_zero_byte = good.clone();
    bad_zero_byte[74] = 1;
    assert!(!is_macbinary(&mut MemSource::new(bad_zero_byte)));

    let mut bad_name = good.clone();
    bad_name[1] = 0;
    assert!(!is_macbinary(&mut MemSource::new(bad_name)));

    let mut bad_version = good.clone();
    bad_version[122] = 7;
    assert!(!is_macbinary(&mut MemSource::new(bad_version)));

    // Fork lengths that overrun the artifact.
    let mut overrun = good;
    overrun[83..87].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    assert!(!is_macbinary(&mut MemSource::new(overrun)));
}

#[test]
fn random_binary_is_not_claimed() {
    let blob: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    let mut filter = Filter::from_bytes("blob.bin", blob.clone()).unwrap();
    assert_eq!(filter.length(), blob.len() as u64);
    assert_eq!(filter.read_fork_to_vec().unwrap(), blob);
}
