//! Persistence module split across logical submodules: one file per table
//! plus the schema helpers and the JSON loaders.

mod authors;
mod books;
mod connection;
mod import;
mod series;
mod statistics;

pub use authors::{
    delete_author_id, get_author, get_author_id, get_author_name, get_authors_number_of_series,
    get_max_author_id, insert_author, update_author_name,
};
pub use books::{
    delete_book_isbn, get_book, get_book_isbn, get_book_series_id, get_book_series_index,
    get_book_title, get_books_info, insert_book, update_book_isbn, update_book_series,
    update_book_series_index, update_book_title, BookFilter,
};
pub use connection::{check_tables, create_tables, open, open_in_memory, CORE_TABLES};
pub use import::{create_views, import_record, load_library, Library, ViewDefinition, ViewDefinitions};
pub use series::{
    delete_series_id, get_max_series_id, get_series, get_series_author_id, get_series_id,
    get_series_name, get_series_number_of_books, insert_series, update_authors_series,
    update_series_author, update_series_name,
};
pub use statistics::{
    delete_statistics_isbn, get_statistics, get_statistics_chapters, get_statistics_finished,
    get_statistics_isbn, get_statistics_pages, get_statistics_released, get_statistics_speed,
    get_statistics_time, insert_statistics, update_statistics_chapters,
    update_statistics_finished, update_statistics_isbn, update_statistics_pages,
    update_statistics_released, update_statistics_speed, update_statistics_time,
};
