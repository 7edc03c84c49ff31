//! Diesel schema for delivery persistence.

diesel::table! {
    /// Accepted messages, one per idempotency key.
    messages (id) {
        /// Message identifier.
        id -> Uuid,
        /// Caller-supplied idempotency key (unique).
        #[max_length = 1024]
        idempotency_key -> Varchar,
        /// Validated envelope stored verbatim.
        envelope -> Jsonb,
        /// Aggregate status.
        #[max_length = 32]
        status -> Varchar,
        /// Optimistic concurrency token.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last status change timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Delivery attempts, unique per (message, channel).
    attempts (id) {
        /// Attempt identifier.
        id -> Uuid,
        /// Owning message.
        message_id -> Uuid,
        /// Channel tag.
        #[max_length = 32]
        channel -> Varchar,
        /// Provider kind tag.
        #[max_length = 32]
        provider -> Varchar,
        /// Attempt status.
        #[max_length = 16]
        status -> Varchar,
        /// Failure code, when failed.
        #[max_length = 128]
        error_code -> Nullable<Varchar>,
        /// Failure description, when failed.
        error_message -> Nullable<Text>,
        /// Provider-assigned identifier, when succeeded.
        #[max_length = 255]
        external_id -> Nullable<Varchar>,
        /// Start timestamp.
        started_at -> Nullable<Timestamptz>,
        /// Terminal timestamp.
        finished_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only delivery events.
    events (id) {
        /// Event identifier.
        id -> Uuid,
        /// Insertion sequence used as an ordering tie-breaker.
        seq -> Int8,
        /// Owning message.
        message_id -> Uuid,
        /// Dotted event type.
        #[max_length = 64]
        event_type -> Varchar,
        /// Channel tag, when the event concerns one.
        #[max_length = 32]
        channel -> Nullable<Varchar>,
        /// Provider kind tag, when the event concerns one.
        #[max_length = 32]
        provider -> Nullable<Varchar>,
        /// Opaque payload.
        payload -> Nullable<Jsonb>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(attempts -> messages (message_id));
diesel::joinable!(events -> messages (message_id));
diesel::allow_tables_to_appear_in_same_query!(messages, attempts, events);
