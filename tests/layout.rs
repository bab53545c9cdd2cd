// Layout conformance tests for the mailbox.
// The segment is shared between processes of different bitness, so every
// offset is pinned here. The observed values are printed to aid debugging
// when a mismatch occurs on a given platform.
use memoffset::offset_of;
use shm_mailbox::Mailbox::{MailboxLayout, RequestState, ResponseState, MAILBOX_CAPACITY};
use std::mem::{align_of, size_of};

#[test]
fn test_mailbox_layout() {
    let size = size_of::<MailboxLayout>();
    let align = align_of::<MailboxLayout>();
    let off_magic = offset_of!(MailboxLayout, magic);
    let off_version = offset_of!(MailboxLayout, version);
    let off_request_flag = offset_of!(MailboxLayout, request_flag);
    let off_response_flag = offset_of!(MailboxLayout, response_flag);
    let off_sequence_id = offset_of!(MailboxLayout, sequence_id);
    let off_request_size = offset_of!(MailboxLayout, request_size);
    let off_response_size = offset_of!(MailboxLayout, response_size);
    let off_last_request_time = offset_of!(MailboxLayout, last_request_time);
    let off_last_response_time = offset_of!(MailboxLayout, last_response_time);
    let off_request_buffer = offset_of!(MailboxLayout, request_buffer);
    let off_response_buffer = offset_of!(MailboxLayout, response_buffer);

    println!(
        "MailboxLayout => size: {size}, align: {align}, offsets: [magic:{off_magic}, version:{off_version}, request_flag:{off_request_flag}, response_flag:{off_response_flag}, sequence_id:{off_sequence_id}, request_size:{off_request_size}, response_size:{off_response_size}, last_request_time:{off_last_request_time}, last_response_time:{off_last_response_time}, request_buffer:{off_request_buffer}, response_buffer:{off_response_buffer}]"
    );

    assert_eq!(MAILBOX_CAPACITY, 4096);
    assert_eq!(size, 8256);
    assert_eq!(size, MailboxLayout::SIZE);
    assert_eq!(align, 64);
    assert_eq!(off_magic, 0);
    assert_eq!(off_version, 4);
    assert_eq!(off_request_flag, 8);
    assert_eq!(off_response_flag, 12);
    assert_eq!(off_sequence_id, 16);
    assert_eq!(off_request_size, 20);
    assert_eq!(off_response_size, 24);
    assert_eq!(off_last_request_time, 32);
    assert_eq!(off_last_response_time, 40);
    assert_eq!(off_request_buffer, 48);
    assert_eq!(off_response_buffer, 48 + MAILBOX_CAPACITY);
}

#[test]
fn test_flag_values() {
    assert_eq!(RequestState::Empty as u32, 0);
    assert_eq!(RequestState::Pending as u32, 1);
    assert_eq!(RequestState::Processing as u32, 2);
    assert_eq!(ResponseState::NotReady as u32, 0);
    assert_eq!(ResponseState::Ready as u32, 1);

    for raw in 0..3 {
        assert_eq!(RequestState::from_u32(raw).map(|s| s as u32), Some(raw));
    }
    assert_eq!(RequestState::from_u32(3), None);
    assert_eq!(ResponseState::from_u32(2), None);
}
