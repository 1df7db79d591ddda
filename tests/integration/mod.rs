mod rewrite_lopdf;
mod transport_lopdf;
