mod batches;
mod captures;
mod observations;
mod timeline_cards;
