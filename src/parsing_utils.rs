use nom::bytes::complete::{is_not, tag};
use nom::character::complete::{anychar, u64 as nomu64};
use nom::multi::separated_list1;
use nom::IResult;

pub(crate) fn consume_field(l: &str) -> IResult<&str, &str> {
    is_not("\t\r\n")(l)
}

pub(crate) fn consume_digit(l: &str) -> IResult<&str, u64> {
    tag("\t")(l).and_then(|(r, _)| nomu64(r))
}

pub(crate) fn consume_char(l: &str) -> IResult<&str, char> {
    tag("\t")(l).and_then(|(r, _)| anychar(r))
}

pub(crate) fn consume_list<'a>(
    l: &'a str,
    sep: &'a str,
) -> IResult<&'a str, Vec<&'a str>> {
    separated_list1(tag(sep), is_not(",\t\r\n"))(l)
}
