mod prop_filter;
mod prop_pagination;
