use tiller::{WireValue, codec, entity};
use time::Date;

entity! {
    #[derive(Debug)]
    pub struct User {
        pub id: i64,
        pub parent: Option<i64>,
        pub first_name: String,
        pub last_name: String,
        pub email: Option<String>,
        pub age: Option<i64>,
        pub died: Option<Date> = codec::DATE,
    }
    table = "users",
    identity = [id],
    order = [last_name => Asc, first_name => Asc],
    computed = [full_name => User::full_name],
}

impl User {
    pub fn full_name(&self) -> String {
        let first = self.first_name.get().map_or("", String::as_str);
        let last = self.last_name.get().map_or("", String::as_str);
        format!("{first} {last}").trim().to_string()
    }
}

/// Live columns of `users`, camel cased to exercise the field mapping.
pub const USER_COLUMNS: [&str; 7] = [
    "id",
    "parent",
    "firstName",
    "lastName",
    "email",
    "age",
    "died",
];

entity! {
    #[derive(Debug)]
    pub struct Group {
        pub id: i64,
        pub name: String,
    }
    table = "groups",
    identity = [id],
    order = [name => Asc],
}

pub const GROUP_COLUMNS: [&str; 2] = ["id", "name"];

entity! {
    #[derive(Debug)]
    pub struct Membership {
        pub user_id: i64,
        pub group_id: i64,
        pub role: Option<String>,
    }
    table = "memberships",
    identity = [user_id, group_id],
}

pub const MEMBERSHIP_COLUMNS: [&str; 3] = ["user_id", "group_id", "role"];

entity! {
    #[derive(Debug)]
    pub struct Profile {
        pub id: i64,
        pub user_id: Option<i64>,
        pub bio: Option<String>,
    }
    table = "profiles",
    identity = [id],
}

pub const PROFILE_COLUMNS: [&str; 3] = ["id", "userId", "bio"];

fn text_or_null(value: Option<&str>) -> WireValue {
    value.map_or_else(WireValue::null, WireValue::text)
}

/// Wire row of `users`, in [`USER_COLUMNS`] order.
pub fn user_row(
    id: i64,
    parent: Option<i64>,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
    age: Option<i64>,
    died: Option<&str>,
) -> Vec<WireValue> {
    vec![
        WireValue::integer(id),
        parent.map_or_else(WireValue::null, WireValue::integer),
        WireValue::text(first_name),
        WireValue::text(last_name),
        text_or_null(email),
        age.map_or_else(WireValue::null, WireValue::integer),
        text_or_null(died),
    ]
}

pub fn group_row(id: i64, name: &str) -> Vec<WireValue> {
    vec![WireValue::integer(id), WireValue::text(name)]
}

pub fn profile_row(id: i64, user_id: Option<i64>, bio: Option<&str>) -> Vec<WireValue> {
    vec![
        WireValue::integer(id),
        user_id.map_or_else(WireValue::null, WireValue::integer),
        text_or_null(bio),
    ]
}
