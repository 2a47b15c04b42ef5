diesel::table! {
    appointments (id) {
        id -> Int4,
        #[max_length = 64]
        staff_id -> Varchar,
        start_time -> Timestamp,
        duration_min -> Int4,
        #[max_length = 120]
        name -> Varchar,
        #[max_length = 200]
        email -> Varchar,
        #[max_length = 64]
        phone -> Varchar,
        notes -> Text,
        created_at -> Timestamp,
    }
}
