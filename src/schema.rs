table! {
    hot_drinks_drink_types (id) {
        id -> Int4,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    hot_drinks_drinks (id) {
        id -> Int4,
        machine_id -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    hot_drinks_machines (id) {
        id -> Int4,
        name -> Varchar,
        drink_type_id -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

joinable!(hot_drinks_drinks -> hot_drinks_machines (machine_id));
joinable!(hot_drinks_machines -> hot_drinks_drink_types (drink_type_id));

allow_tables_to_appear_in_same_query!(
    hot_drinks_drink_types,
    hot_drinks_drinks,
    hot_drinks_machines,
);
