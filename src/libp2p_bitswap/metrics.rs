// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::LazyLock;

use prometheus_client::metrics::{counter::Counter, family::Family, gauge::Gauge};

use crate::metrics::KindLabel;

static MESSAGE_COUNTER: LazyLock<Family<KindLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    crate::metrics::default_registry().register(
        "bitswap_message_count",
        "Number of bitswap messages",
        metric.clone(),
    );
    metric
});

static CONTAINER_CAPACITIES: LazyLock<Family<KindLabel, Gauge>> = LazyLock::new(|| {
    let metric = Family::default();
    crate::metrics::default_registry().register(
        "bitswap_container_capacities",
        "Capacity for each bitswap container",
        metric.clone(),
    );
    metric
});

static INBOUND_STREAM_COUNT: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    crate::metrics::default_registry().register(
        "bitswap_inbound_stream_count",
        "Number of bitswap inbound streams",
        metric.clone(),
    );
    metric
});

static OUTBOUND_STREAM_COUNT: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    crate::metrics::default_registry().register(
        "bitswap_outbound_stream_count",
        "Number of bitswap outbound streams",
        metric.clone(),
    );
    metric
});

static INBOUND_BYTES: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    crate::metrics::default_registry().register(
        "bitswap_inbound_bytes",
        "Number of bitswap inbound bytes",
        metric.clone(),
    );
    metric
});

static OUTBOUND_BYTES: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    crate::metrics::default_registry().register(
        "bitswap_outbound_bytes",
        "Number of bitswap outbound bytes",
        metric.clone(),
    );
    metric
});

mod values {
    use crate::metrics::KindLabel;

    pub const INBOUND_REQUEST_HAVE: KindLabel = KindLabel::new("inbound_request_have");
    pub const INBOUND_REQUEST_BLOCK: KindLabel = KindLabel::new("inbound_request_block");
    pub const INBOUND_REQUEST_CANCEL: KindLabel = KindLabel::new("inbound_request_cancel");
    pub const OUTBOUND_REQUEST_HAVE: KindLabel = KindLabel::new("outbound_request_have");
    pub const OUTBOUND_REQUEST_BLOCK: KindLabel = KindLabel::new("outbound_request_block");
    pub const OUTBOUND_REQUEST_CANCEL: KindLabel = KindLabel::new("outbound_request_cancel");
    pub const INBOUND_RESPONSE_HAVE_YES: KindLabel = KindLabel::new("inbound_response_have_yes");
    pub const INBOUND_RESPONSE_HAVE_NO: KindLabel = KindLabel::new("inbound_response_have_no");
    pub const INBOUND_RESPONSE_BLOCK: KindLabel = KindLabel::new("inbound_response_block");
    pub const INBOUND_RESPONSE_BLOCK_INVALID: KindLabel =
        KindLabel::new("inbound_response_block_invalid");
    pub const INBOUND_RESPONSE_BLOCK_UPDATE_DB: KindLabel =
        KindLabel::new("inbound_response_block_update_db");
    pub const INBOUND_RESPONSE_BLOCK_UPDATE_DB_FAILURE: KindLabel =
        KindLabel::new("inbound_response_block_update_db_failure");
    pub const OUTBOUND_RESPONSE_HAVE: KindLabel = KindLabel::new("outbound_response_have");
    pub const OUTBOUND_RESPONSE_BLOCK: KindLabel = KindLabel::new("outbound_response_block");

    pub const PEER_CONTAINER: KindLabel = KindLabel::new("peer_container_capacity");
    pub const PENDING_FETCH_CONTAINER: KindLabel =
        KindLabel::new("pending_fetch_container_capacity");
}

fn message_counter(label: &KindLabel) -> Counter {
    MESSAGE_COUNTER.get_or_create(label).clone()
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_request_have() -> Counter {
    message_counter(&values::INBOUND_REQUEST_HAVE)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_request_block() -> Counter {
    message_counter(&values::INBOUND_REQUEST_BLOCK)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_request_cancel() -> Counter {
    message_counter(&values::INBOUND_REQUEST_CANCEL)
}

pub(in crate::libp2p_bitswap) fn message_counter_outbound_request_have() -> Counter {
    message_counter(&values::OUTBOUND_REQUEST_HAVE)
}

pub(in crate::libp2p_bitswap) fn message_counter_outbound_request_block() -> Counter {
    message_counter(&values::OUTBOUND_REQUEST_BLOCK)
}

pub(in crate::libp2p_bitswap) fn message_counter_outbound_request_cancel() -> Counter {
    message_counter(&values::OUTBOUND_REQUEST_CANCEL)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_response_have_yes() -> Counter {
    message_counter(&values::INBOUND_RESPONSE_HAVE_YES)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_response_have_no() -> Counter {
    message_counter(&values::INBOUND_RESPONSE_HAVE_NO)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_response_block() -> Counter {
    message_counter(&values::INBOUND_RESPONSE_BLOCK)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_response_block_invalid() -> Counter {
    message_counter(&values::INBOUND_RESPONSE_BLOCK_INVALID)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_response_block_update_db() -> Counter {
    message_counter(&values::INBOUND_RESPONSE_BLOCK_UPDATE_DB)
}

pub(in crate::libp2p_bitswap) fn message_counter_inbound_response_block_update_db_failure()
-> Counter {
    message_counter(&values::INBOUND_RESPONSE_BLOCK_UPDATE_DB_FAILURE)
}

pub(in crate::libp2p_bitswap) fn message_counter_outbound_response_have() -> Counter {
    message_counter(&values::OUTBOUND_RESPONSE_HAVE)
}

pub(in crate::libp2p_bitswap) fn message_counter_outbound_response_block() -> Counter {
    message_counter(&values::OUTBOUND_RESPONSE_BLOCK)
}

pub(in crate::libp2p_bitswap) fn peer_container_capacity() -> Gauge {
    CONTAINER_CAPACITIES
        .get_or_create(&values::PEER_CONTAINER)
        .clone()
}

pub(in crate::libp2p_bitswap) fn pending_fetch_container_capacity() -> Gauge {
    CONTAINER_CAPACITIES
        .get_or_create(&values::PENDING_FETCH_CONTAINER)
        .clone()
}

pub(in crate::libp2p_bitswap) fn inbound_stream_count() -> &'static Counter {
    &INBOUND_STREAM_COUNT
}

pub(in crate::libp2p_bitswap) fn outbound_stream_count() -> &'static Counter {
    &OUTBOUND_STREAM_COUNT
}

pub(in crate::libp2p_bitswap) fn inbound_bytes() -> &'static Counter {
    &INBOUND_BYTES
}

pub(in crate::libp2p_bitswap) fn outbound_bytes() -> &'static Counter {
    &OUTBOUND_BYTES
}
