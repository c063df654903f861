//! GET_FILE_COUNT + GET_FILE_LIST flow

mod common;

use pretty_assertions::assert_eq;

use common::*;
use jensen::Command;

fn count_body(count: u32) -> Vec<u8> {
    count.to_be_bytes().to_vec()
}

#[tokio::test]
async fn test_list_untimestamped_files_when_enabled() {
    let config = test_config().include_untimestamped_files(true);
    let (device, handle) = connected_with(config, |req| {
        if is(req, Command::GetFileCount) {
            vec![reply(req, count_body(2))]
        } else {
            let mut body = list_entry(2, "a.wav", 1044);
            body.extend(list_entry(2, "b.wav", 2088));
            vec![reply(req, body)]
        }
    })
    .await;

    let files = device.list_files().await.unwrap();

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.wav", "b.wav"]);
    assert_eq!(files[0].length, 1044);
    assert_eq!(files[1].length, 2088);
    assert!((files[0].duration_secs - 1000.0 / 96_000.0).abs() < 1e-9);
    assert!((files[1].duration_secs - 2044.0 / 96_000.0).abs() < 1e-9);

    let commands: Vec<u16> = handle.requests().iter().map(|r| r.command_id).collect();
    assert_eq!(commands, vec![6, 4]);
}

#[tokio::test]
async fn test_untimestamped_files_hidden_by_default() {
    let (device, _handle) = connected(|req| {
        if is(req, Command::GetFileCount) {
            vec![reply(req, count_body(3))]
        } else {
            let mut body = list_entry(2, "a.wav", 1044);
            body.extend(list_entry(1, "20250512114141REC44.wav", 3200));
            body.extend(list_entry(5, "2025May12-114141-Rec45.hda", 120_000));
            vec![reply(req, body)]
        }
    })
    .await;

    let files = device.list_files().await.unwrap();

    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["20250512114141REC44.wav", "2025May12-114141-Rec45.hda"]);
    assert_eq!(files[0].duration_secs, 200.0);
    assert_eq!(files[1].duration_secs, 10.0);

    let raw = device.list_files_raw().await.unwrap();
    assert_eq!(raw.entries.len(), 3);
}

#[tokio::test]
async fn test_list_spread_over_frames() {
    let (device, _handle) = connected(|req| {
        if is(req, Command::GetFileCount) {
            return vec![reply(req, count_body(2))];
        }

        let mut body = vec![0xFF, 0xFF, 0, 0, 0, 2];
        body.extend(list_entry(1, "20250101000000REC01.wav", 64));
        body.extend(list_entry(1, "20250101000100REC02.wav", 128));
        let (first, second) = body.split_at(20);

        // Later frames are matched on command id, not sequence id
        vec![
            reply(req, first.to_vec()),
            frame(req.command_id, 0, second.to_vec()),
        ]
    })
    .await;

    let files = device.list_files().await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[1].name, "20250101000100REC02.wav");
    assert_eq!(files[1].length, 128);
}

#[tokio::test]
async fn test_empty_device_skips_list_request() {
    let (device, handle) = connected(|req| vec![reply(req, count_body(0))]).await;

    assert!(device.list_files().await.unwrap().is_empty());
    assert_eq!(handle.requests().len(), 1);
}
