fn main() {
    subqueue::app::startup::startup();
}
