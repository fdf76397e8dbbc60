fn main() {
    // sqlx::migrate! embeds the SQL files at compile time, so a new or
    // edited migration must trigger a rebuild
    println!("cargo:rerun-if-changed=migrations");
}
