pub trait FileExtProvider {
    fn file_ext(&self) -> Option<&'static str>;
}
