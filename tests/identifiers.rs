//! Connection id counter, checked in its own process so no other test has
//! taken a value first.

use chat_relay::ConnectionId;

#[test]
fn test_counter_starts_at_zero() {
    assert_eq!(ConnectionId::next().as_str(), "0");
    assert_eq!(ConnectionId::next().as_str(), "1");
}
